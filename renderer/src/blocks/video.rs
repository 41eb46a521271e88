use blockmark::descriptor::{Dimension, Preload, VideoContent};

use super::{css_length, error_panel, escape, escape_url};

const DEFAULT_WIDTH: &str = "100%";
const DEFAULT_HEIGHT: &str = "auto";

/// What a video block shows for its current input.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoState {
    /// Skeleton sized from whatever dimensions are known so far.
    Loading { width: Dimension, height: Dimension },
    Error(String),
    Ready(VideoPlayerConfig),
}

/// Size handed to the player: pixel counts as numbers, everything else as CSS.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerSize {
    Pixels(f64),
    Css(String),
}

impl PlayerSize {
    fn from_dimension(dimension: Option<&Dimension>, default: &str) -> Self {
        match dimension {
            Some(d) => match d.pixels() {
                Some(px) => PlayerSize::Pixels(px),
                None => match d {
                    Dimension::Text(text) => {
                        PlayerSize::Css(css_length(text).unwrap_or_else(|| default.to_string()))
                    }
                    Dimension::Number(_) => PlayerSize::Css(default.to_string()),
                },
            },
            None => PlayerSize::Css(default.to_string()),
        }
    }
}

/// Fully defaulted player settings.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPlayerConfig {
    pub src: String,
    pub alt: Option<String>,
    pub autoplay: bool,
    pub controls: bool,
    pub width: PlayerSize,
    pub height: PlayerSize,
    pub poster: Option<String>,
    pub muted: bool,
    pub r#loop: bool,
    pub preload: Preload,
}

impl VideoPlayerConfig {
    fn from_content(content: &VideoContent) -> Self {
        let options = &content.additional;
        VideoPlayerConfig {
            src: content.src.as_deref().unwrap_or_default().trim().to_string(),
            alt: content.alt.clone().filter(|alt| !alt.is_empty()),
            autoplay: options.autoplay.unwrap_or(false),
            controls: options.controls.unwrap_or(true),
            width: PlayerSize::from_dimension(options.width.as_ref(), DEFAULT_WIDTH),
            height: PlayerSize::from_dimension(options.height.as_ref(), DEFAULT_HEIGHT),
            poster: options.poster.clone().filter(|p| !p.trim().is_empty()),
            muted: options.muted.unwrap_or(false),
            r#loop: options.r#loop.unwrap_or(false),
            preload: options
                .preload
                .as_deref()
                .and_then(Preload::parse)
                .unwrap_or(Preload::Metadata),
        }
    }
}

/// Pick the state of a video block. The checks run in a fixed order:
/// loading flags first, then a parse error, then a missing source.
pub fn video_state(
    content: &VideoContent,
    is_loading: bool,
    is_complete: bool,
    parse_error: Option<&str>,
) -> VideoState {
    if is_loading || !is_complete {
        let options = &content.additional;
        return VideoState::Loading {
            width: options
                .width
                .clone()
                .unwrap_or_else(|| Dimension::Text(DEFAULT_WIDTH.into())),
            height: options
                .height
                .clone()
                .unwrap_or_else(|| Dimension::Text(DEFAULT_HEIGHT.into())),
        };
    }

    if let Some(message) = parse_error {
        return VideoState::Error(message.to_string());
    }

    if !content.has_source() {
        return VideoState::Loading {
            width: Dimension::Text(DEFAULT_WIDTH.into()),
            height: Dimension::Text(DEFAULT_HEIGHT.into()),
        };
    }
    VideoState::Ready(VideoPlayerConfig::from_content(content))
}

/// Markup for a video state. `loading_height` replaces an `auto` height in
/// the skeleton, which has no intrinsic size.
pub fn render(state: &VideoState, loading_height: &str) -> String {
    match state {
        VideoState::Loading { width, height } => skeleton(width, height, loading_height),
        VideoState::Error(message) => error_panel("Could not load video", message),
        VideoState::Ready(config) => player(config),
    }
}

fn skeleton(width: &Dimension, height: &Dimension, loading_height: &str) -> String {
    let width = dimension_css(width).unwrap_or_else(|| DEFAULT_WIDTH.to_string());
    let height = match dimension_css(height) {
        Some(css) if css != "auto" => css,
        _ => loading_height.to_string(),
    };
    format!(
        r#"<div class="custom-block custom-block-loading custom-block-video-loading" aria-busy="true" style="width:{};height:{}"></div>"#,
        escape(&width),
        escape(&height)
    )
}

fn dimension_css(dimension: &Dimension) -> Option<String> {
    match dimension {
        Dimension::Number(n) if n.is_finite() && *n >= 0.0 => Some(format!("{}px", n)),
        Dimension::Number(_) => None,
        Dimension::Text(text) => css_length(text),
    }
}

fn player(config: &VideoPlayerConfig) -> String {
    let mut attrs = format!(r#" src="{}""#, escape_url(&config.src));
    let mut style = Vec::new();

    for (name, size) in [("width", &config.width), ("height", &config.height)] {
        match size {
            PlayerSize::Pixels(px) => attrs.push_str(&format!(r#" {}="{}""#, name, px)),
            PlayerSize::Css(css) => style.push(format!("{}:{}", name, css)),
        }
    }
    if !style.is_empty() {
        attrs.push_str(&format!(r#" style="{}""#, escape(&style.join(";"))));
    }
    if let Some(poster) = &config.poster {
        attrs.push_str(&format!(r#" poster="{}""#, escape_url(poster)));
    }
    if let Some(alt) = &config.alt {
        attrs.push_str(&format!(r#" aria-label="{}""#, escape(alt)));
    }
    attrs.push_str(&format!(r#" preload="{}""#, config.preload.as_str()));
    for (flag, on) in [
        ("controls", config.controls),
        ("autoplay", config.autoplay),
        ("muted", config.muted),
        ("loop", config.r#loop),
    ] {
        if on {
            attrs.push(' ');
            attrs.push_str(flag);
        }
    }

    let fallback = config.alt.as_deref().map(escape).unwrap_or_default();
    format!(
        r#"<div class="custom-block custom-block-video"><video{} playsinline>{}</video></div>"#,
        attrs, fallback
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmark::descriptor::VideoOptions;

    fn content(src: Option<&str>, additional: VideoOptions) -> VideoContent {
        VideoContent {
            src: src.map(str::to_string),
            alt: None,
            additional,
        }
    }

    #[test]
    fn loading_flags_win_over_parse_error() {
        let state = video_state(&content(None, VideoOptions::default()), false, false, Some("bad"));
        assert!(matches!(state, VideoState::Loading { .. }));
    }

    #[test]
    fn parse_error_on_complete_block() {
        let state = video_state(&content(Some("a.mp4"), VideoOptions::default()), false, true, Some("bad"));
        assert_eq!(state, VideoState::Error("bad".into()));
    }

    #[test]
    fn missing_source_is_loading_with_default_size() {
        let additional = VideoOptions {
            width: Some(Dimension::Text("640px".into())),
            ..VideoOptions::default()
        };
        let state = video_state(&content(Some("  "), additional), false, true, None);
        assert_eq!(
            state,
            VideoState::Loading {
                width: Dimension::Text("100%".into()),
                height: Dimension::Text("auto".into()),
            }
        );
    }

    #[test]
    fn ready_applies_defaults() {
        let state = video_state(&content(Some("a.mp4"), VideoOptions::default()), false, true, None);
        let VideoState::Ready(config) = state else {
            panic!("expected ready state");
        };
        assert!(!config.autoplay);
        assert!(config.controls);
        assert!(!config.muted);
        assert!(!config.r#loop);
        assert_eq!(config.preload, Preload::Metadata);
        assert_eq!(config.width, PlayerSize::Css("100%".into()));
        assert_eq!(config.height, PlayerSize::Css("auto".into()));
    }

    #[test]
    fn pixel_strings_become_numbers() {
        let additional = VideoOptions {
            width: Some(Dimension::Text("640px".into())),
            height: Some(Dimension::Number(360.0)),
            preload: Some("none".into()),
            ..VideoOptions::default()
        };
        let VideoState::Ready(config) = video_state(&content(Some("a.mp4"), additional), false, true, None) else {
            panic!("expected ready state");
        };
        assert_eq!(config.width, PlayerSize::Pixels(640.0));
        assert_eq!(config.height, PlayerSize::Pixels(360.0));
        assert_eq!(config.preload, Preload::None);

        let html = render(&VideoState::Ready(config), "300px");
        assert!(html.contains(r#"width="640""#), "{}", html);
        assert!(html.contains(r#"height="360""#), "{}", html);
        assert!(!html.contains("style="), "{}", html);
    }

    #[test]
    fn skeleton_replaces_auto_height() {
        let html = render(
            &VideoState::Loading {
                width: Dimension::Text("100%".into()),
                height: Dimension::Text("auto".into()),
            },
            "300px",
        );
        assert!(html.contains("width:100%;height:300px"), "{}", html);
    }

    #[test]
    fn skeleton_rejects_css_injection() {
        let html = render(
            &VideoState::Loading {
                width: Dimension::Text("10px;background:url(x)".into()),
                height: Dimension::Number(200.0),
            },
            "300px",
        );
        assert!(html.contains("width:100%;height:200px"), "{}", html);
    }
}
