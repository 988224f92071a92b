#![doc = "rentmap public API"]
pub mod bucket;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod join;
pub mod key;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod render;
pub mod source;

#[doc(inline)]
pub use bucket::{Bucket, BucketTuple, ConstructionEra, Dimension, Furnishing, RoomCount};

#[doc(inline)]
pub use cache::PipelineCache;

#[doc(inline)]
pub use config::AppConfig;

#[doc(inline)]
pub use error::{KeyError, PipelineError};

#[doc(inline)]
pub use join::{LongFormRow, LongFormTable, RegionAttributes};

#[doc(inline)]
pub use key::{CompoundKey, KeyClassifier};

#[doc(inline)]
pub use pipeline::Dataset;

#[doc(inline)]
pub use query::{AggregatedRegion, Aggregation, FilterSelection, SelectionDefaults, aggregate};

#[doc(inline)]
pub use source::{RegionRecord, SourceId, SourceSchema};
