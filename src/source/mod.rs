// Network boundary — pluggable resource fetchers behind the ResourceSource trait.

pub mod http_source;
pub mod traits;
