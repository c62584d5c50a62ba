pub mod cache;
pub mod directive;
pub mod render;
pub mod resolver;
pub mod robots;
pub mod rule;
pub mod static_file;

pub use cache::{CacheError, SingleFlightCache};
pub use directive::{Directive, normalize_key};
pub use render::render;
pub use resolver::{ResolveError, RuleResolver};
pub use robots::{LoadError, ROBOTS_CACHE_KEY, RobotsError, RobotsService, load_specification};
pub use rule::{
    DynamicValue, RequestContext, ResolvedRule, RuleItem, RuleSet, RuleSpecification, RuleValue,
};
pub use static_file::parse_static_file;
