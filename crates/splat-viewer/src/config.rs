use crate::{
    camera::{TwistMode, DEFAULT_FOV_DEG, DEFAULT_SENSITIVITY},
    gate::DEFAULT_FRAMES_IN_FLIGHT,
    model::ModelIdentifier,
    renderer::RendererOptions,
};
use clap::{ArgGroup, Parser};
use pointfile::MalformedLinePolicy;
use std::path::PathBuf;

/// `splat-viewer` - An interactive viewer for gaussian splats and colored
/// point clouds.
///
/// Drag to orbit, pinch or scroll to zoom, twist with two fingers to turn.
/// With no model flag the built-in sample box is shown.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("model").args(["splat", "points", "sample_box"])))]
pub struct Config {
    /// A `.splat` file of 32-byte gaussian records.
    #[arg(long, env = "SPLAT_VIEWER_SPLAT")]
    pub splat: Option<PathBuf>,

    /// A text file with one `x y z r g b` point per line, colors 0-255.
    #[arg(long, env = "SPLAT_VIEWER_POINTS")]
    pub points: Option<PathBuf>,

    /// Show the built-in colored cube.
    #[arg(long)]
    pub sample_box: bool,

    /// Initial vertical field of view, clamped to 15-90 degrees.
    #[arg(long, env = "SPLAT_VIEWER_FOV_DEG", default_value_t = DEFAULT_FOV_DEG)]
    pub fov_deg: f32,

    /// Degrees of rotation per pixel of drag.
    #[arg(long, env = "SPLAT_VIEWER_SENSITIVITY", default_value_t = DEFAULT_SENSITIVITY)]
    pub sensitivity: f32,

    /// Frames that may be queued on the GPU before rendering waits.
    #[arg(long, env = "SPLAT_VIEWER_FRAMES_IN_FLIGHT", default_value_t = DEFAULT_FRAMES_IN_FLIGHT as u32,
          value_parser = clap::value_parser!(u32).range(1..=8))]
    pub frames_in_flight: u32,

    /// Which rotation a two-finger twist feeds.
    #[arg(long, env = "SPLAT_VIEWER_TWIST_MODE", value_enum, default_value_t = TwistMode::DragDominant)]
    pub twist_mode: TwistMode,

    /// Skip point lines that do not parse instead of failing the load.
    #[arg(long, env = "SPLAT_VIEWER_SKIP_MALFORMED")]
    pub skip_malformed: bool,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

impl Config {
    pub fn model(&self) -> ModelIdentifier {
        match (&self.splat, &self.points) {
            (Some(path), _) => ModelIdentifier::GaussianSplat(path.clone()),
            (None, Some(path)) => ModelIdentifier::SimplePointCloud(path.clone()),
            (None, None) => ModelIdentifier::SampleBox,
        }
    }

    pub fn malformed_lines(&self) -> MalformedLinePolicy {
        if self.skip_malformed {
            MalformedLinePolicy::Skip
        } else {
            MalformedLinePolicy::Reject
        }
    }

    pub fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            frames_in_flight: self.frames_in_flight as usize,
            malformed_lines: self.malformed_lines(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("splat-viewer").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_show_the_sample_box() {
        let cfg = parse(&[]).unwrap();
        assert_eq!(cfg.model(), ModelIdentifier::SampleBox);
        assert_eq!(cfg.fov_deg, DEFAULT_FOV_DEG);
        assert_eq!(cfg.frames_in_flight as usize, DEFAULT_FRAMES_IN_FLIGHT);
        assert_eq!(cfg.twist_mode, TwistMode::DragDominant);
        assert_eq!(cfg.malformed_lines(), MalformedLinePolicy::Reject);
    }

    #[test]
    fn points_flag_selects_point_cloud() {
        let cfg = parse(&["--points", "scan.txt", "--skip-malformed"]).unwrap();
        assert_eq!(cfg.model(), ModelIdentifier::SimplePointCloud("scan.txt".into()));
        assert_eq!(cfg.renderer_options().malformed_lines, MalformedLinePolicy::Skip);
    }

    #[test]
    fn model_flags_are_exclusive() {
        assert!(parse(&["--splat", "a.splat", "--points", "b.txt"]).is_err());
        assert!(parse(&["--splat", "a.splat", "--sample-box"]).is_err());
    }

    #[test]
    fn twist_mode_parses_kebab_case() {
        let cfg = parse(&["--twist-mode", "up-axis"]).unwrap();
        assert_eq!(cfg.twist_mode, TwistMode::UpAxis);
    }

    #[test]
    fn zero_frames_in_flight_is_rejected() {
        assert!(parse(&["--frames-in-flight", "0"]).is_err());
    }
}
