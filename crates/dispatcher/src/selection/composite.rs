use tracing::trace;

use super::{SelectionContext, SelectionFilter};

/// 组合过滤器：依次求值所有过滤器并拼接拒绝原因
pub struct CompositeFilter<T> {
    filters: Vec<Box<dyn SelectionFilter<T>>>,
}

impl<T> CompositeFilter<T> {
    pub fn new(filters: Vec<Box<dyn SelectionFilter<T>>>) -> Self {
        Self { filters }
    }

    pub fn empty() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub fn with(mut self, filter: impl SelectionFilter<T> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn accepts(&self, input: &T, ctx: &SelectionContext<'_>) -> bool {
        self.apply_all(input, ctx).is_empty()
    }

    fn apply_all(&self, input: &T, ctx: &SelectionContext<'_>) -> Vec<String> {
        self.filters
            .iter()
            .flat_map(|filter| {
                let reasons = filter.apply(input, ctx);
                if !reasons.is_empty() {
                    trace!("过滤器 {} 拒绝: {:?}", filter.name(), reasons);
                }
                reasons
            })
            .collect()
    }
}

impl<T> Default for CompositeFilter<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> SelectionFilter<T> for CompositeFilter<T> {
    fn name(&self) -> &'static str {
        "Composite"
    }

    fn apply(&self, input: &T, ctx: &SelectionContext<'_>) -> Vec<String> {
        self.apply_all(input, ctx)
    }
}
