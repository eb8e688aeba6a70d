mod env_guard;
