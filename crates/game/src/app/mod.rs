pub(crate) mod assets;
pub(crate) mod audio;
pub(crate) mod bootstrap;
pub(crate) mod headless;
pub(crate) mod input;
pub(crate) mod loop_runner;
pub(crate) mod metrics;
pub(crate) mod paths;
pub(crate) mod renderer;
pub(crate) mod session;
