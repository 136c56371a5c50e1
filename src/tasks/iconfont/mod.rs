// src/tasks/iconfont/mod.rs

//! Icon-font task: one producer, two consumers, explicit join.
//!
//! The producer turns the icon SVGs into a [`GeneratedFont`]. The stylesheet
//! sink and the font sink then run as separate Tokio tasks sharing it; the
//! task completes only when both have finished, and a failure names the sink
//! that failed.

pub mod font;
pub mod glyphs;
pub mod sinks;
pub mod stylesheet;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, error};

use crate::errors::{PipelineError, Result};

pub use font::{generate_font, glyph_outline, GeneratedFont};
pub use glyphs::{assign_codepoints, Glyph};
pub use sinks::{FontSink, IconSink, StylesheetSink};

/// The pair of consumers fed by the producer.
#[derive(Debug, Clone)]
pub struct IconFontSinks {
    pub stylesheet: Arc<dyn IconSink>,
    pub fonts: Arc<dyn IconSink>,
}

/// Paths written by each sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkOutputs {
    pub stylesheet: Vec<PathBuf>,
    pub fonts: Vec<PathBuf>,
}

/// Fan `font` out to both sinks and wait for both.
pub async fn distribute(font: GeneratedFont, sinks: &IconFontSinks) -> Result<SinkOutputs> {
    let font = Arc::new(font);

    let stylesheet = tokio::spawn(sinks.stylesheet.write(Arc::clone(&font)));
    let fonts = tokio::spawn(sinks.fonts.write(font));

    let (stylesheet, fonts) = tokio::join!(stylesheet, fonts);

    match (flatten(stylesheet), flatten(fonts)) {
        (Ok(stylesheet), Ok(fonts)) => {
            debug!(?stylesheet, ?fonts, "both icon font sinks finished");
            Ok(SinkOutputs { stylesheet, fonts })
        }
        (stylesheet, fonts) => {
            let stylesheet = stylesheet.err();
            let fonts = fonts.err();
            error!(?stylesheet, ?fonts, "icon font sink failed");
            Err(PipelineError::IconFontSinks { stylesheet, fonts })
        }
    }
}

fn flatten(
    joined: std::result::Result<anyhow::Result<Vec<PathBuf>>, JoinError>,
) -> std::result::Result<Vec<PathBuf>, String> {
    match joined {
        Ok(Ok(paths)) => Ok(paths),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(err) => Err(format!("sink task aborted: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use anyhow::anyhow;

    use super::sinks::SinkFuture;

    #[derive(Debug)]
    struct ScriptedSink {
        delay: Duration,
        fail: bool,
        done: Arc<AtomicBool>,
        out: &'static str,
    }

    impl ScriptedSink {
        fn new(delay_ms: u64, fail: bool, out: &'static str) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                fail,
                done: Arc::new(AtomicBool::new(false)),
                out,
            })
        }
    }

    impl IconSink for ScriptedSink {
        fn write(&self, _font: Arc<GeneratedFont>) -> SinkFuture {
            let delay = self.delay;
            let fail = self.fail;
            let done = Arc::clone(&self.done);
            let out = self.out;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                done.store(true, Ordering::SeqCst);
                if fail {
                    Err(anyhow!("disk full"))
                } else {
                    Ok(vec![PathBuf::from(out)])
                }
            })
        }
    }

    fn font() -> GeneratedFont {
        GeneratedFont {
            font_name: "iconfont".to_string(),
            glyphs: Vec::new(),
            svg: String::new(),
            converted: Vec::new(),
        }
    }

    #[tokio::test]
    async fn waits_for_the_slower_sink() {
        let css = ScriptedSink::new(150, false, "dest/css/iconfont.css");
        let fonts = ScriptedSink::new(0, false, "../fonts/iconfont.svg");
        let sinks = IconFontSinks {
            stylesheet: css.clone(),
            fonts: fonts.clone(),
        };

        let out = distribute(font(), &sinks).await.unwrap();
        assert!(css.done.load(Ordering::SeqCst));
        assert!(fonts.done.load(Ordering::SeqCst));
        assert_eq!(out.stylesheet, vec![PathBuf::from("dest/css/iconfont.css")]);
        assert_eq!(out.fonts, vec![PathBuf::from("../fonts/iconfont.svg")]);
    }

    #[tokio::test]
    async fn failure_names_the_failing_sink() {
        let css = ScriptedSink::new(0, false, "dest/css/iconfont.css");
        let fonts = ScriptedSink::new(50, true, "");
        let sinks = IconFontSinks {
            stylesheet: css,
            fonts: fonts.clone(),
        };

        let err = distribute(font(), &sinks).await.unwrap_err();
        match err {
            PipelineError::IconFontSinks { stylesheet, fonts: font_err } => {
                assert!(stylesheet.is_none());
                assert_eq!(font_err.as_deref(), Some("disk full"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The failing sink still ran to completion before the join returned.
        assert!(fonts.done.load(Ordering::SeqCst));
    }
}
