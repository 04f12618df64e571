//! Page renderers used for responsive captures.
//!
//! A [`Renderer`] turns a local HTML document into an encoded PNG at a
//! given viewport size. Every call blocks until the capture is done or has
//! failed; a failure only affects the breakpoint being captured.
//!
//! Two implementations are provided:
//! - [`HeadlessChromeRenderer`] runs a Chromium executable in headless
//!   screenshot mode as a child process.
//! - `CdpRenderer` (feature `browser`) drives Chromium over the DevTools
//!   protocol with chromiumoxide and captures the full page.

use crate::result::{FidelityError, FidelityResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;

/// Environment variable naming the browser executable
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

/// Default time allowed for one capture
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

const EXECUTABLE_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Produces a raster capture of a local document
pub trait Renderer {
    /// Render `source` at `width` x `height` and return the encoded image
    fn render(&mut self, source: &Path, width: u32, height: u32) -> FidelityResult<Vec<u8>>;
}

/// `file://` URL for an absolute path; `None` for relative paths
#[must_use]
pub fn file_url(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(String::from)
}

fn document_url(document: &Path, width: u32) -> FidelityResult<String> {
    file_url(document).ok_or_else(|| FidelityError::Render {
        document: document.to_path_buf(),
        width,
        message: "not expressible as a file:// URL".to_string(),
    })
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Locate a Chromium executable: `CHROMIUM_PATH` first, then `PATH`
pub fn locate_chromium() -> FidelityResult<PathBuf> {
    if let Some(path) = std::env::var_os(CHROMIUM_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    EXECUTABLE_CANDIDATES
        .iter()
        .find_map(|name| find_on_path(name))
        .ok_or_else(|| FidelityError::RendererUnavailable {
            message: format!("Browser not found. Install Chromium or set {CHROMIUM_PATH_ENV}"),
        })
}

/// Headless Chromium invoked once per capture.
///
/// Screenshots land in a private temporary directory, created on the first
/// capture and removed when the renderer is dropped.
#[derive(Debug)]
pub struct HeadlessChromeRenderer {
    executable: PathBuf,
    timeout: Duration,
    sandbox: bool,
    scratch_parent: Option<PathBuf>,
    scratch: Option<TempDir>,
    captures: u64,
}

impl HeadlessChromeRenderer {
    /// Use the given browser executable
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: DEFAULT_RENDER_TIMEOUT,
            sandbox: true,
            scratch_parent: None,
            scratch: None,
            captures: 0,
        }
    }

    /// Locate the browser via [`locate_chromium`]
    pub fn from_env() -> FidelityResult<Self> {
        locate_chromium().map(Self::new)
    }

    /// Set the per-capture timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable the browser sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Parent of the temporary capture directory (default: the system temp dir)
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }

    /// Browser executable in use
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn arguments(&self, url: &str, screenshot: &Path, width: u32, height: u32) -> Vec<String> {
        let mut args = vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            "--force-device-scale-factor=1".to_string(),
            format!("--window-size={width},{height}"),
            format!("--screenshot={}", screenshot.display()),
        ];
        if !self.sandbox {
            args.push("--no-sandbox".to_string());
        }
        args.push(url.to_string());
        args
    }

    fn next_screenshot(&mut self, width: u32) -> FidelityResult<PathBuf> {
        let scratch = match self.scratch.take() {
            Some(scratch) => scratch,
            None => {
                let mut builder = tempfile::Builder::new();
                builder.prefix("fidelity-capture.");
                match &self.scratch_parent {
                    Some(parent) => builder.tempdir_in(parent)?,
                    None => builder.tempdir()?,
                }
            }
        };
        self.captures += 1;
        let screenshot = scratch
            .path()
            .join(format!("capture-{}-{width}.png", self.captures));
        self.scratch = Some(scratch);
        Ok(screenshot)
    }
}

impl Renderer for HeadlessChromeRenderer {
    fn render(&mut self, source: &Path, width: u32, height: u32) -> FidelityResult<Vec<u8>> {
        let document = std::fs::canonicalize(source)?;
        let url = document_url(&document, width)?;
        let screenshot = self.next_screenshot(width)?;

        tracing::debug!(url = %url, width, height, "launching headless capture");
        let mut child = Command::new(&self.executable)
            .args(self.arguments(&url, &screenshot, width, height))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| FidelityError::RendererUnavailable {
                message: format!("{}: {e}", self.executable.display()),
            })?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FidelityError::RenderTimeout {
                    document,
                    width,
                    ms: self.timeout.as_millis() as u64,
                });
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        if !status.success() {
            return Err(FidelityError::Render {
                document,
                width,
                message: format!("browser exited with {status}"),
            });
        }

        std::fs::read(&screenshot).map_err(|e| FidelityError::Render {
            document,
            width,
            message: format!("no screenshot written: {e}"),
        })
    }
}

// ============================================================================
// CDP implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
pub use cdp::{CdpConfig, CdpRenderer};

#[cfg(feature = "browser")]
mod cdp {
    use super::{document_url, Renderer, DEFAULT_RENDER_TIMEOUT};
    use crate::result::{FidelityError, FidelityResult};
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpBrowserConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use futures::StreamExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    /// Launch options for [`CdpRenderer`]
    #[derive(Debug, Clone)]
    pub struct CdpConfig {
        /// Path to chromium binary (None = auto-detect)
        pub chromium_path: Option<PathBuf>,
        /// Sandbox mode (disable for containers)
        pub sandbox: bool,
        /// Time allowed for one capture
        pub timeout: Duration,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                chromium_path: None,
                sandbox: true,
                timeout: DEFAULT_RENDER_TIMEOUT,
            }
        }
    }

    /// Renderer backed by one long-lived browser over CDP
    #[derive(Debug)]
    pub struct CdpRenderer {
        runtime: tokio::runtime::Runtime,
        browser: CdpBrowser,
        handle: tokio::task::JoinHandle<()>,
        timeout: Duration,
    }

    impl CdpRenderer {
        /// Launch the browser
        pub fn launch(config: CdpConfig) -> FidelityResult<Self> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()?;

            let mut builder = CdpBrowserConfig::builder();
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder
                .build()
                .map_err(|message| FidelityError::RendererUnavailable { message })?;

            let (browser, mut handler) = runtime
                .block_on(CdpBrowser::launch(cdp_config))
                .map_err(|e| FidelityError::RendererUnavailable {
                    message: e.to_string(),
                })?;

            let handle = runtime.spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                runtime,
                browser,
                handle,
                timeout: config.timeout,
            })
        }

        /// Close the browser
        pub fn close(mut self) -> FidelityResult<()> {
            let result = self.runtime.block_on(self.browser.close());
            self.handle.abort();
            result
                .map(|_| ())
                .map_err(|e| FidelityError::RendererUnavailable {
                    message: e.to_string(),
                })
        }
    }

    impl Renderer for CdpRenderer {
        fn render(&mut self, source: &Path, width: u32, height: u32) -> FidelityResult<Vec<u8>> {
            let document = std::fs::canonicalize(source)?;
            let url = document_url(&document, width)?;
            let browser = &self.browser;

            let capture = async {
                let page = browser.new_page("about:blank").await?;
                page.execute(SetDeviceMetricsOverrideParams::new(
                    i64::from(width),
                    i64::from(height),
                    1.0,
                    false,
                ))
                .await?;
                page.goto(url.as_str()).await?;
                page.wait_for_navigation().await?;

                let params = CaptureScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .capture_beyond_viewport(true)
                    .build();
                let screenshot = page.execute(params).await?;
                let _ = page.close().await;
                Ok::<_, chromiumoxide::error::CdpError>(screenshot)
            };

            let screenshot = match self
                .runtime
                .block_on(tokio::time::timeout(self.timeout, capture))
            {
                Ok(Ok(screenshot)) => screenshot,
                Ok(Err(e)) => {
                    return Err(FidelityError::Render {
                        document,
                        width,
                        message: e.to_string(),
                    })
                }
                Err(_) => {
                    return Err(FidelityError::RenderTimeout {
                        document,
                        width,
                        ms: self.timeout.as_millis() as u64,
                    })
                }
            };

            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| FidelityError::Render {
                    document,
                    width,
                    message: e.to_string(),
                })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_file_url_plain_path() {
        assert_eq!(
            file_url(Path::new("/srv/site/index.html")).as_deref(),
            Some("file:///srv/site/index.html")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_escapes_reserved_characters() {
        assert_eq!(
            file_url(Path::new("/srv/my site/a#b%c.html")).as_deref(),
            Some("file:///srv/my%20site/a%23b%25c.html")
        );
    }

    #[test]
    fn test_relative_path_has_no_file_url() {
        assert!(file_url(Path::new("site/index.html")).is_none());
        let err = document_url(Path::new("site/index.html"), 320).unwrap_err();
        assert!(matches!(err, FidelityError::Render { width: 320, .. }));
    }

    #[test]
    fn test_headless_arguments() {
        let renderer = HeadlessChromeRenderer::new("/usr/bin/chromium").with_no_sandbox();
        let args = renderer.arguments("file:///x.html", Path::new("/tmp/out.png"), 768, 4000);
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--window-size=768,4000".to_string()));
        assert!(args.contains(&"--screenshot=/tmp/out.png".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("file:///x.html"));
    }

    #[test]
    fn test_missing_executable_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, "<html></html>").unwrap();

        let mut renderer = HeadlessChromeRenderer::new("/nonexistent/fidelity/chromium");
        let err = renderer.render(&page, 320, 800).unwrap_err();
        assert!(matches!(err, FidelityError::RendererUnavailable { .. }));
    }

    #[test]
    fn test_missing_document_fails() {
        let mut renderer = HeadlessChromeRenderer::new("/nonexistent/fidelity/chromium");
        let err = renderer
            .render(Path::new("/nonexistent/fidelity/page.html"), 320, 800)
            .unwrap_err();
        assert!(matches!(err, FidelityError::Io(_)));
    }

    #[cfg(unix)]
    mod fake_browser {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-chromium");
            std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        const WRITE_SCREENSHOT: &str = "for arg in \"$@\"; do\n  case \"$arg\" in\n    --screenshot=*) printf capture > \"${arg#--screenshot=}\" ;;\n  esac\ndone\n";

        #[test]
        fn test_capture_uses_private_scratch_dir() {
            let dir = tempfile::TempDir::new().unwrap();
            let scratch = dir.path().join("scratch");
            std::fs::create_dir_all(&scratch).unwrap();
            let page = dir.path().join("index.html");
            std::fs::write(&page, "<html></html>").unwrap();

            let mut renderer = HeadlessChromeRenderer::new(script(dir.path(), WRITE_SCREENSHOT))
                .with_scratch_dir(&scratch);
            assert_eq!(renderer.render(&page, 320, 800).unwrap(), b"capture");
            assert_eq!(renderer.render(&page, 768, 800).unwrap(), b"capture");
            assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 1);

            drop(renderer);
            assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
        }

        #[test]
        fn test_failing_browser_is_render_error() {
            let dir = tempfile::TempDir::new().unwrap();
            let page = dir.path().join("index.html");
            std::fs::write(&page, "<html></html>").unwrap();

            let mut renderer = HeadlessChromeRenderer::new(script(dir.path(), "exit 3\n"))
                .with_scratch_dir(dir.path());
            let err = renderer.render(&page, 320, 800).unwrap_err();
            assert!(matches!(err, FidelityError::Render { width: 320, .. }));
            assert!(err.to_string().contains("exited"));
        }

        #[test]
        fn test_slow_browser_times_out() {
            let dir = tempfile::TempDir::new().unwrap();
            let page = dir.path().join("index.html");
            std::fs::write(&page, "<html></html>").unwrap();

            let mut renderer = HeadlessChromeRenderer::new(script(dir.path(), "sleep 5\n"))
                .with_timeout(Duration::from_millis(200));
            let err = renderer.render(&page, 320, 800).unwrap_err();
            assert!(matches!(err, FidelityError::RenderTimeout { ms: 200, .. }));
        }
    }
}
