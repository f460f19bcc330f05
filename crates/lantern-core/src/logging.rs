pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter("info,lantern_core=debug,lantern_render=debug")
        .init();
}
