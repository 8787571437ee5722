pub mod caching;
pub mod ecb;
pub mod frankfurter;
pub mod util;

pub use caching::CachingRateProvider;
pub use ecb::EcbProvider;
pub use frankfurter::FrankfurterProvider;
