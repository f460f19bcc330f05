//! Frame profiling built on the `puffin` crate.
//!
//! Hot paths in the renderer are annotated with [`profile_function`] and
//! [`profile_scope`]; attach `puffin_viewer` to see where batch time goes.

use std::sync::OnceLock;

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Where collected profiling data is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Serve frames to `puffin_viewer` over HTTP.
    PuffinHttp,
}

/// Keeps the HTTP server alive for the lifetime of the process.
static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Enable scope collection and start the selected backend.
///
/// # Example
/// ```no_run
/// use lantern_core::profiling::{init_profiling, ProfilingBackend};
///
/// init_profiling(ProfilingBackend::PuffinHttp);
/// ```
pub fn init_profiling(backend: ProfilingBackend) {
    match backend {
        ProfilingBackend::PuffinHttp => {
            puffin::set_scopes_on(true);

            // Default puffin port, the one puffin_viewer connects to.
            match puffin_http::Server::new("0.0.0.0:8585") {
                Ok(server) => {
                    tracing::info!("puffin profiler server listening on 0.0.0.0:8585");
                    let _ = PROFILING_SERVER.set(server);
                }
                Err(e) => {
                    tracing::error!("failed to start puffin server: {e}");
                }
            }
        }
    }
}

/// Mark a frame boundary.
///
/// Call once per frame so scopes group correctly in the viewer.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
