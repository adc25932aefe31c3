pub mod config;
pub mod events;
pub mod job;
pub mod reorganizer;
pub mod scanner;
pub mod transcoder;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ServerConfig,
};
pub use events::{ConversionEvent, ErrorDetail, EventSink, FileCompletion, NullSink};
pub use job::{FileError, JobError, JobProgress, JobResult, JobRunner};
pub use reorganizer::{reorganize_folder, ReorganizeError, ReorganizeResult};
pub use scanner::{
    detect_structure, find_source_files, needs_conversion, scan_folder, FolderStructure,
    ScanError, ScanResult, SourceFile, SOURCE_EXT, TARGET_EXT,
};
pub use transcoder::{
    FfmpegTranscoder, ProgressSample, SampleCallback, Transcoder, TranscoderConfig,
    TranscoderError,
};
