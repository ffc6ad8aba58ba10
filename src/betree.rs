use crate::{
    ast::Node,
    config::Config,
    dictionary::ValueId,
    domains::{AttributeDefinition, AttributeId, DomainRegistry, RawValue},
    error::{BETreeError, ParserError},
    events::{Event, EventBuilder, EventError},
    parser,
    partition::{PartitionTree, Slot},
};
use lalrpop_util::ParseError;
use std::{collections::HashMap, fmt::Debug, hash::Hash};
use tracing::{debug, trace};

/// An index of boolean expressions partitioned by the attribute values they constrain.
///
/// See the [module documentation] for more details.
///
/// [module documentation]: index.html
#[derive(Clone, Debug)]
pub struct BETree<T> {
    domains: DomainRegistry,
    tree: PartitionTree<T>,
    by_ids: HashMap<T, Slot>,
    config: Config,
}

impl<T: Eq + Hash + Clone + Debug> BETree<T> {
    /// Create a new [`BETree`] with the attributes that can be used by the inserted boolean
    /// expressions along with their types.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use be_tree::{AttributeDefinition, BETree, Config};
    ///
    /// let definitions = [
    ///     AttributeDefinition::boolean("private"),
    ///     AttributeDefinition::bounded_integer("exchange_id", 0, 100)
    /// ];
    /// let result = BETree::<u64>::new(Config::default(), &definitions);
    /// assert!(result.is_ok());
    /// ```
    ///
    /// Duplicate attributes are not allowed:
    ///
    /// ```rust
    /// use be_tree::{AttributeDefinition, BETree, Config};
    ///
    /// let definitions = [
    ///     AttributeDefinition::boolean("private"),
    ///     AttributeDefinition::boolean("private"),
    /// ];
    /// let result = BETree::<u64>::new(Config::default(), &definitions);
    /// assert!(result.is_err());
    /// ```
    pub fn new(config: Config, definitions: &[AttributeDefinition]) -> Result<Self, BETreeError> {
        let domains = DomainRegistry::new(definitions)?;
        Ok(Self {
            domains,
            tree: PartitionTree::new(),
            by_ids: HashMap::new(),
            config,
        })
    }

    /// Register one more attribute. Only allowed before the first insertion.
    pub fn register(
        &mut self,
        definition: &AttributeDefinition,
    ) -> Result<AttributeId, BETreeError> {
        Ok(self.domains.register(definition)?)
    }

    /// Encode a value through the attribute's dictionary, growing it when allowed.
    pub fn resolve_or_assign(
        &mut self,
        name: &str,
        value: RawValue,
        always_assign: bool,
    ) -> Result<ValueId, BETreeError> {
        let id = self.domains.lookup(name)?.id();
        Ok(self.domains.resolve_or_assign(id, value, always_assign)?)
    }

    /// Encode a value through the attribute's dictionary without growing it.
    pub fn try_resolve(&self, name: &str, value: RawValue) -> Result<ValueId, BETreeError> {
        let id = self.domains.lookup(name)?.id();
        Ok(self.domains.try_resolve(id, value)?)
    }

    /// Parse an expression against the registered attributes.
    ///
    /// String and enumeration literals are added to their attribute's dictionary.
    pub fn parse(&mut self, expression: &str) -> Result<Node, BETreeError> {
        parser::parse(expression, &mut self.domains).map_err(|error| match error {
            ParseError::User {
                error: ParserError::Domain(error),
            } => BETreeError::Domain(error),
            error => BETreeError::Parse(error.map_token(|token| token.to_string())),
        })
    }

    /// Insert a boolean expression inside the [`BETree`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use be_tree::{AttributeDefinition, BETree, Config};
    ///
    /// let definitions = [
    ///     AttributeDefinition::boolean("private"),
    ///     AttributeDefinition::integer("exchange_id")
    /// ];
    /// let mut betree = BETree::new(Config::default(), &definitions).unwrap();
    /// assert!(betree.insert(&1u64, "exchange_id = 5").is_ok());
    /// assert!(betree.insert(&2u64, "private").is_ok());
    /// assert!(betree.insert(&2u64, "not private").is_err());
    /// ```
    pub fn insert(&mut self, id: &T, expression: &str) -> Result<(), BETreeError> {
        if self.by_ids.contains_key(id) {
            return Err(duplicate(id));
        }
        let node = self.parse(expression)?;
        self.insert_node(id, node)
    }

    /// Insert an already parsed boolean expression.
    pub fn insert_node(&mut self, id: &T, node: Node) -> Result<(), BETreeError> {
        if self.by_ids.contains_key(id) {
            return Err(duplicate(id));
        }
        let root = node.optimize();
        for predicate in root.predicates() {
            predicate.check(&self.domains)?;
        }

        self.domains.freeze();
        let slot = self.tree.insert(id.clone(), root, &self.domains, &self.config);
        self.by_ids.insert(id.clone(), slot);
        trace!(?id, slot, "inserted expression");
        Ok(())
    }

    /// Create a new [`EventBuilder`] to be able to generate an [`Event`] that will be usable for
    /// finding the matching boolean expressions inside the [`BETree`] via the
    /// [`BETree::search`] function.
    #[inline]
    pub fn make_event(&self) -> EventBuilder<'_> {
        EventBuilder::new(&self.domains)
    }

    /// Search the [`BETree`] for boolean expressions that match the [`Event`].
    pub fn search(&self, event: &Event) -> Result<Report<'_, T>, BETreeError> {
        self.search_until(event, |_| false)
    }

    /// Search the [`BETree`], asking `should_stop` before visiting each leaf whether to give up.
    ///
    /// An interrupted search returns the matches found so far in a report that is not
    /// [complete](Report::is_complete).
    pub fn search_until<F>(
        &self,
        event: &Event,
        should_stop: F,
    ) -> Result<Report<'_, T>, BETreeError>
    where
        F: FnMut(&Report<'_, T>) -> bool,
    {
        self.validate(event)?;
        let report = self
            .tree
            .search(event, self.config.undefined_policy(), should_stop);
        debug!(
            evaluated = report.evaluated(),
            matched = report.matched(),
            complete = report.is_complete(),
            "searched expressions"
        );
        Ok(report)
    }

    fn validate(&self, event: &Event) -> Result<(), EventError> {
        if event.len() != self.domains.len() {
            return Err(EventError::UnknownAttribute {
                expected: self.domains.len(),
                actual: event.len(),
            });
        }
        for domain in self.domains.iter() {
            match event.lookup(domain.id()) {
                None if !domain.allows_undefined() => {
                    return Err(EventError::UndefinedAttribute(domain.name().to_owned()));
                }
                Some(value) if value.is_empty_list() && domain.kind().is_list() => {}
                Some(value) => match value.kind() {
                    Some(actual) if actual != domain.kind() => {
                        return Err(EventError::WrongType {
                            name: domain.name().to_owned(),
                            expected: domain.kind(),
                            actual,
                        });
                    }
                    _ => {}
                },
                None => {}
            }
        }
        Ok(())
    }

    /// Delete the boolean expression; returns whether it was present.
    ///
    /// The partitions are not rebalanced.
    pub fn delete(&mut self, id: &T) -> bool {
        match self.by_ids.remove(id) {
            Some(slot) => self.tree.delete(slot).is_some(),
            None => false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    #[inline]
    pub fn domains(&self) -> &DomainRegistry {
        &self.domains
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render the partition tree in the graphviz format.
    pub fn to_graphviz(&self) -> String {
        self.tree.to_graphviz()
    }
}

fn duplicate<T: Debug>(id: &T) -> BETreeError {
    BETreeError::DuplicateExpression(format!("{id:?}"))
}

/// The outcome of one search.
#[derive(Clone, Debug)]
pub struct Report<'a, T> {
    evaluated: usize,
    matched: usize,
    matches: Vec<&'a T>,
    complete: bool,
}

impl<'a, T> Report<'a, T> {
    pub(crate) const fn new() -> Self {
        Self {
            evaluated: 0,
            matched: 0,
            matches: Vec::new(),
            complete: true,
        }
    }

    #[inline]
    pub(crate) fn record(&mut self, id: &'a T, matched: bool) {
        self.evaluated += 1;
        if matched {
            self.matched += 1;
            self.matches.push(id);
        }
    }

    #[inline]
    pub(crate) fn interrupt(&mut self) {
        self.complete = false;
    }

    /// Number of distinct expressions evaluated.
    #[inline]
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    #[inline]
    pub fn matched(&self) -> usize {
        self.matched
    }

    #[inline]
    /// Get the search matches
    pub fn matches(&self) -> &[&'a T] {
        &self.matches
    }

    /// Whether every reachable leaf was visited.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}
