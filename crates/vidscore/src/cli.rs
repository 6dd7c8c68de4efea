use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use vidscore_core::config::{PageSpec, DEFAULT_DPI};

#[derive(Parser)]
#[command(name = "vidscore", about = "Turn a cropped region of a video into paginated score sheets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the size and duration of a video file.
    Probe {
        /// Path to the input video file (MP4, etc.).
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Sample a cropped region and render it onto pages.
    Extract {
        /// Path to the input video file (MP4, etc.).
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write page images and the export request to.
        #[arg(short, long)]
        output: PathBuf,

        /// Crop region as X,Y,WIDTH,HEIGHT in displayed pixels.
        #[arg(long)]
        crop: CropArg,

        /// Size the crop was drawn at, as WIDTHxHEIGHT. Defaults to the
        /// video's own size.
        #[arg(long)]
        display: Option<SizeArg>,

        /// First sample, in milliseconds.
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// End of the range (exclusive), in milliseconds. Defaults to the
        /// video's duration.
        #[arg(long)]
        end: Option<u64>,

        /// Time between samples, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval: u64,

        /// Frames stacked on each page. Planned from the crop when omitted.
        #[arg(long)]
        frames_per_page: Option<u32>,

        /// Frame width as a percentage of the usable page width (70-100).
        #[arg(long, default_value_t = 95)]
        width_percent: u32,

        /// Gap between frames, in points.
        #[arg(long, default_value_t = 10)]
        gap: u32,

        /// Title printed at the top of each page. Only previewed frames
        /// carry a title, so this cannot be combined with --direct.
        #[arg(long, conflicts_with = "direct")]
        title: Option<String>,

        /// Skip the preview and let the renderer sample the video itself.
        #[arg(long)]
        direct: bool,

        /// Page resolution.
        #[arg(long, default_value_t = DEFAULT_DPI, value_parser = parse_dpi)]
        dpi: f64,

        /// Give up on a seek after this many milliseconds.
        #[arg(long, default_value_t = 5000)]
        seek_timeout_ms: u64,

        /// Save the reference frame with the crop outlined to this path.
        #[arg(long)]
        debug_reference: Option<PathBuf>,
    },
}

fn parse_dpi(s: &str) -> Result<f64, String> {
    let dpi = s
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid dpi {s:?}: {e}"))?;
    PageSpec::checked_scale(dpi).map_err(|e| e.to_string())?;
    Ok(dpi)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropArg {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FromStr for CropArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid crop {s:?}: {e}"))?;
        let [x, y, width, height] = parts[..] else {
            return Err(format!("crop must be X,Y,WIDTH,HEIGHT, got {s:?}"));
        };
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeArg {
    pub width: f64,
    pub height: f64,
}

impl FromStr for SizeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("size must be WIDTHxHEIGHT, got {s:?}"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid size {s:?}: {e}"))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_crop() {
        let crop: CropArg = "10,20.5, 300,40".parse().unwrap();
        assert_eq!(
            crop,
            CropArg {
                x: 10.0,
                y: 20.5,
                width: 300.0,
                height: 40.0
            }
        );
    }

    #[test]
    fn rejects_short_crop() {
        assert!("10,20,300".parse::<CropArg>().is_err());
        assert!("a,b,c,d".parse::<CropArg>().is_err());
    }

    #[test]
    fn parses_size() {
        let size: SizeArg = "960x540".parse().unwrap();
        assert_eq!((size.width, size.height), (960.0, 540.0));
        assert!("960".parse::<SizeArg>().is_err());
    }

    #[test]
    fn dpi_is_range_checked() {
        assert_eq!(parse_dpi("150").unwrap(), 150.0);
        for bad in ["0", "-1", "NaN", "inf", "5000", "high"] {
            assert!(parse_dpi(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn title_conflicts_with_direct() {
        let result = Cli::try_parse_from([
            "vidscore", "extract", "-i", "in.mp4", "-o", "out", "--crop", "0,0,800,400",
            "--direct", "--title", "Etude",
        ]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "vidscore", "extract", "-i", "in.mp4", "-o", "out", "--crop", "0,0,800,400",
            "--title", "Etude",
        ])
        .unwrap();
        let Command::Extract { title, dpi, .. } = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(title.as_deref(), Some("Etude"));
        assert_eq!(dpi, DEFAULT_DPI);
    }

    #[test]
    fn extract_command_parses() {
        let cli = Cli::try_parse_from([
            "vidscore", "extract", "-i", "in.mp4", "-o", "out", "--crop", "0,0,800,400",
            "--end", "3000", "--direct",
        ])
        .unwrap();
        let Command::Extract { crop, end, direct, interval, .. } = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(crop.width, 800.0);
        assert_eq!(end, Some(3000));
        assert_eq!(interval, 1000);
        assert!(direct);
    }
}
