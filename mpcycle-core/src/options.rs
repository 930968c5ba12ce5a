//! Builds the player command line for one window from `[defaults]` and the
//! window's own overrides.
//!
//! Every option is resolved by its own function: the window value wins when it is
//! set, otherwise the default is used, otherwise the option is left out. Options
//! that overlap follow a fixed precedence (see [`resolve_arguments`]).

use mpcycle_common::error::OptionError;
use mpcycle_config::{GlobalConfig, PlayerOptions, Position, SlotConfig, WindowSize, ROTATE_UNSET};

/// Ordered command-line tokens for a single player launch. The stream URL is
/// always the last token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArguments {
    tokens: Vec<String>,
}

impl ResolvedArguments {
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn stream(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Value following `flag`, if the flag is present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.tokens
            .iter()
            .position(|t| t == flag)
            .and_then(|i| self.tokens.get(i + 1))
            .map(String::as_str)
    }

    fn flag(&mut self, enabled: bool, flag: &str) {
        if enabled {
            self.tokens.push(flag.to_string());
        }
    }

    fn pair(&mut self, flag: &str, value: impl ToString) {
        self.tokens.push(flag.to_string());
        self.tokens.push(value.to_string());
    }
}

fn layered<T: Clone>(slot: &Option<T>, global: &Option<T>, is_set: impl Fn(&T) -> bool) -> Option<T> {
    slot.as_ref()
        .filter(|v| is_set(*v))
        .or_else(|| global.as_ref().filter(|v| is_set(*v)))
        .cloned()
}

// `false` is the unset value for a flag, so a window can switch one on but not off
fn layered_flag(slot: Option<bool>, global: Option<bool>) -> bool {
    slot.unwrap_or(false) || global.unwrap_or(false)
}

pub fn monitor_aspect(global: &PlayerOptions, slot: &PlayerOptions) -> Option<f64> {
    layered(&slot.monitor_aspect, &global.monitor_aspect, |v| v.is_finite() && *v >= 0.0)
}

pub fn no_aspect(global: &PlayerOptions, slot: &PlayerOptions) -> bool {
    layered_flag(slot.no_aspect, global.no_aspect)
}

pub fn no_border(global: &PlayerOptions, slot: &PlayerOptions) -> bool {
    layered_flag(slot.no_border, global.no_border)
}

/// Rotation with the "unset" sentinel already filtered out. Range is checked by the caller.
pub fn rotation(global: &PlayerOptions, slot: &PlayerOptions) -> Option<i32> {
    layered(&slot.rotate, &global.rotate, |v| *v != ROTATE_UNSET)
}

pub fn window_position(global: &PlayerOptions, slot: &PlayerOptions) -> Option<Position> {
    layered(&slot.window_position, &global.window_position, |_| true)
}

pub fn window_size(global: &PlayerOptions, slot: &PlayerOptions) -> Option<WindowSize> {
    layered(&slot.window_size, &global.window_size, WindowSize::is_set)
}

pub fn window_width(global: &PlayerOptions, slot: &PlayerOptions) -> Option<u32> {
    layered(&slot.window_width, &global.window_width, |v| *v > 0)
}

pub fn window_width_no_new_aspect(global: &PlayerOptions, slot: &PlayerOptions) -> Option<u32> {
    layered(&slot.window_width_no_new_aspect, &global.window_width_no_new_aspect, |v| *v > 0)
}

pub fn window_height_no_new_aspect(global: &PlayerOptions, slot: &PlayerOptions) -> Option<u32> {
    layered(&slot.window_height_no_new_aspect, &global.window_height_no_new_aspect, |v| *v > 0)
}

pub fn rtsp_stream_over_tcp(global: &PlayerOptions, slot: &PlayerOptions) -> bool {
    layered_flag(slot.rtsp_stream_over_tcp, global.rtsp_stream_over_tcp)
}

pub fn rtsp_stream_over_http(global: &PlayerOptions, slot: &PlayerOptions) -> bool {
    layered_flag(slot.rtsp_stream_over_http, global.rtsp_stream_over_http)
}

pub fn prefer_ipv4(global: &PlayerOptions, slot: &PlayerOptions) -> bool {
    layered_flag(slot.prefer_ipv4, global.prefer_ipv4)
}

pub fn ipv4_only_proxy(global: &PlayerOptions, slot: &PlayerOptions) -> bool {
    layered_flag(slot.ipv4_only_proxy, global.ipv4_only_proxy)
}

pub fn video_output_driver(global: &PlayerOptions, slot: &PlayerOptions) -> Option<Vec<String>> {
    layered(&slot.video_output_driver, &global.video_output_driver, |v| {
        v.iter().any(|d| !d.trim().is_empty())
    })
}

pub fn no_sound(global: &PlayerOptions, slot: &PlayerOptions) -> bool {
    layered_flag(slot.no_sound, global.no_sound)
}

pub fn extra_options(global: &PlayerOptions, slot: &PlayerOptions) -> Vec<String> {
    layered(&slot.extra_options, &global.extra_options, |v| {
        v.iter().any(|o| !o.trim().is_empty())
    })
    .unwrap_or_default()
    .iter()
    .flat_map(|o| o.split_whitespace())
    .map(str::to_string)
    .collect()
}

/// Resolves the full argument list for playing `stream` in `slot`.
///
/// Precedence among overlapping options:
/// - `window_size` hides `window_width`, `window_width_no_new_aspect` and `window_height_no_new_aspect`
/// - `window_width` hides the two `*_no_new_aspect` variants
/// - `window_width_no_new_aspect` hides `window_height_no_new_aspect`
/// - `monitor_aspect` hides `no_aspect`
/// - `rtsp_stream_over_tcp` hides `rtsp_stream_over_http`
pub fn resolve_arguments(
    config: &GlobalConfig,
    slot: &SlotConfig,
    stream: &str,
) -> Result<ResolvedArguments, OptionError> {
    let global = &config.defaults;
    let local = &slot.options;
    let mut args = ResolvedArguments::from_tokens(Vec::new());

    if let Some(angle) = rotation(global, local) {
        if !(0..=7).contains(&angle) {
            return Err(OptionError::InvalidOption {
                slot: slot.index,
                option: "rotate",
                reason: format!("{} is outside 0-7", angle),
            });
        }
        args.pair("-vf", format!("rotate={}", angle));
    }

    let aspect = monitor_aspect(global, local);
    if let Some(ratio) = aspect {
        args.pair("-monitoraspect", ratio);
    }
    args.flag(aspect.is_none() && no_aspect(global, local), "-noaspect");
    args.flag(no_border(global, local), "-noborder");

    if let Some(position) = window_position(global, local) {
        args.pair("-geometry", format!("{}:{}", position.x, position.y));
    }

    match window_size(global, local) {
        Some(WindowSize { width: Some(width), height: Some(height) }) => {
            args.pair("-x", width);
            args.pair("-y", height);
        }
        Some(partial) => {
            let missing = if partial.width.is_none() { "width" } else { "height" };
            return Err(OptionError::InvalidOption {
                slot: slot.index,
                option: "window_size",
                reason: format!("{} is missing", missing),
            });
        }
        None => {
            if let Some(width) = window_width(global, local) {
                args.pair("-xy", width);
            } else if let Some(width) = window_width_no_new_aspect(global, local) {
                args.pair("-x", width);
            } else if let Some(height) = window_height_no_new_aspect(global, local) {
                args.pair("-y", height);
            }
        }
    }

    let over_tcp = rtsp_stream_over_tcp(global, local);
    args.flag(over_tcp, "-rtsp-stream-over-tcp");
    args.flag(!over_tcp && rtsp_stream_over_http(global, local), "-rtsp-stream-over-http");
    args.flag(prefer_ipv4(global, local), "-prefer-ipv4");
    args.flag(ipv4_only_proxy(global, local), "-ipv4-only-proxy");

    if let Some(drivers) = video_output_driver(global, local) {
        args.pair("-vo", drivers.join(","));
    }
    args.flag(no_sound(global, local), "-nosound");

    args.tokens.extend(extra_options(global, local));
    args.tokens.push(stream.to_string());

    Ok(args)
}
