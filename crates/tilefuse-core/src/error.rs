use thiserror::Error;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid raw tile file: {0}")]
    InvalidRaw(String),

    #[error("inconsistent grid topology: {0}")]
    InconsistentTopology(String),

    #[error("tile ({row},{col}) out of range for {rows}x{cols} grid")]
    TileIndexOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("predecessor graph corrupt: {0}")]
    PredecessorGraphCorrupt(String),

    #[error("no stitchable tile to use as placement source")]
    NoStitchableSource,

    #[error("project file error: {0}")]
    Project(String),

    #[error("project parse error: {0}")]
    ProjectParse(#[from] toml::de::Error),

    #[error("project encode error: {0}")]
    ProjectEncode(#[from] toml::ser::Error),

    #[error("image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, StitchError>;
