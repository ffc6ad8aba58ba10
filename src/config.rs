/// How the search treats a partition whose attribute is undefined in the event.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub enum UndefinedPolicy {
    /// Only visit the catch-all child. Expressions that constrain the attribute cannot be
    /// definitely true when it is undefined.
    #[default]
    CatchAllOnly,
    /// Visit every child.
    VisitAll,
}

/// Tuning knobs of the partition tree.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Config {
    leaf_capacity: usize,
    partition_min_size: u64,
    max_split_attempts: usize,
    undefined_policy: UndefinedPolicy,
}

impl Config {
    pub const DEFAULT_LEAF_CAPACITY: usize = 3;
    pub const DEFAULT_PARTITION_MIN_SIZE: u64 = 0;
    pub const DEFAULT_MAX_SPLIT_ATTEMPTS: usize = 1000;

    pub const fn new() -> Self {
        Self {
            leaf_capacity: Self::DEFAULT_LEAF_CAPACITY,
            partition_min_size: Self::DEFAULT_PARTITION_MIN_SIZE,
            max_split_attempts: Self::DEFAULT_MAX_SPLIT_ATTEMPTS,
            undefined_policy: UndefinedPolicy::CatchAllOnly,
        }
    }

    /// Leaves holding more expressions than this are split. `0` disables splitting.
    #[inline]
    pub const fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// Attributes whose domain is smaller than this are never partitioned on.
    #[inline]
    pub const fn partition_min_size(&self) -> u64 {
        self.partition_min_size
    }

    /// Failed split attempts after which a leaf is left alone.
    #[inline]
    pub const fn max_split_attempts(&self) -> usize {
        self.max_split_attempts
    }

    #[inline]
    pub const fn undefined_policy(&self) -> UndefinedPolicy {
        self.undefined_policy
    }

    pub const fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.leaf_capacity = leaf_capacity;
        self
    }

    pub const fn with_partition_min_size(mut self, partition_min_size: u64) -> Self {
        self.partition_min_size = partition_min_size;
        self
    }

    pub const fn with_max_split_attempts(mut self, max_split_attempts: usize) -> Self {
        self.max_split_attempts = max_split_attempts;
        self
    }

    pub const fn with_undefined_policy(mut self, undefined_policy: UndefinedPolicy) -> Self {
        self.undefined_policy = undefined_policy;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_the_documented_defaults() {
        let config = Config::default();

        assert_eq!(3, config.leaf_capacity());
        assert_eq!(0, config.partition_min_size());
        assert_eq!(1000, config.max_split_attempts());
        assert_eq!(UndefinedPolicy::CatchAllOnly, config.undefined_policy());
    }

    #[test]
    fn can_override_every_setting() {
        let config = Config::new()
            .with_leaf_capacity(8)
            .with_partition_min_size(16)
            .with_max_split_attempts(2)
            .with_undefined_policy(UndefinedPolicy::VisitAll);

        assert_eq!(8, config.leaf_capacity());
        assert_eq!(16, config.partition_min_size());
        assert_eq!(2, config.max_split_attempts());
        assert_eq!(UndefinedPolicy::VisitAll, config.undefined_policy());
    }
}
