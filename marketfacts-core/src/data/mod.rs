//! Repository contracts, batch transport and storage.

pub mod batch;
pub mod frame;
pub mod memory;
pub mod repository;
pub mod store;

pub use batch::{merge, Batch, BatchMeta, Matrix, MergeError, Payload, RaggedRowsError};
pub use frame::{
    indicators_to_frame, prices_to_frame, FrameError, IndicatorFrameSchema, PriceFrameSchema,
};
pub use memory::InMemoryRepository;
pub use repository::{
    EconomicUnitReadRepository, IndicatorQuery, IndicatorReadRepository, IndicatorStream,
    ListingPriceQuery, ListingPriceReadRepository, ListingReadRepository, ListingStream,
    PriceQuery, PriceReadRepository, PriceStream, QueryError, RepositoryError, TimeWindow,
};
pub use store::{CsvFactStore, StoreError, StoreMeta};
