//! Paging and sorting types for list queries.
//!
//! Sort properties are typed keys mapped to fixed column names, so no
//! caller-provided text ever reaches an `ORDER BY` clause.

use thiserror::Error;

/// Sort direction of one order clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sortable property of some entity.
pub trait SortKey: Copy {
    /// Column name the property is stored in.
    fn column(self) -> &'static str;
}

/// Sortable customer properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSortKey {
    Id,
    FirstName,
    LastName,
    CreatedAt,
    UpdatedAt,
}

impl SortKey for CustomerSortKey {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order<K> {
    pub property: K,
    pub direction: Direction,
}

impl<K: SortKey> Order<K> {
    pub fn asc(property: K) -> Self {
        Self {
            property,
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: K) -> Self {
        Self {
            property,
            direction: Direction::Desc,
        }
    }
}

/// Ordered list of order clauses; earlier clauses take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort<K> {
    orders: Vec<Order<K>>,
}

impl<K: SortKey> Sort<K> {
    pub fn by(orders: impl IntoIterator<Item = Order<K>>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    /// Leaves row order to the storage engine.
    pub fn unsorted() -> Self {
        Self { orders: Vec::new() }
    }

    /// Appends a lower-precedence clause.
    pub fn and(mut self, order: Order<K>) -> Self {
        self.orders.push(order);
        self
    }

    pub fn orders(&self) -> &[Order<K>] {
        &self.orders
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// Renders ` ORDER BY ...`, or an empty string when unsorted.
    pub(crate) fn to_order_by_sql(&self) -> String {
        if self.orders.is_empty() {
            return String::new();
        }
        let clauses = self
            .orders
            .iter()
            .map(|order| format!("{} {}", order.property.column(), order.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" ORDER BY {clauses}")
    }
}

/// Rejected page request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    #[error("page size must be greater than zero")]
    ZeroSize,
}

/// Zero-based page index, page size, and sort applied before slicing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<K = CustomerSortKey> {
    page: u32,
    size: u32,
    sort: Sort<K>,
}

impl<K: SortKey> PageRequest<K> {
    pub fn of(page: u32, size: u32, sort: Sort<K>) -> Result<Self, PageRequestError> {
        if size == 0 {
            return Err(PageRequestError::ZeroSize);
        }
        Ok(Self { page, size, sort })
    }

    /// Unsorted page request.
    pub fn of_size(page: u32, size: u32) -> Result<Self, PageRequestError> {
        Self::of(page, size, Sort::unsorted())
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> &Sort<K> {
        &self.sort
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Request for the following page with the same size and sort.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            size: self.size,
            sort: self.sort.clone(),
        }
    }
}

/// One page of results plus totals over the whole matching set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    number: u32,
    size: u32,
    total_elements: u64,
}

impl<T> Page<T> {
    pub fn new<K: SortKey>(content: Vec<T>, request: &PageRequest<K>, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page(),
            size: request.size(),
            total_elements,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    /// Zero-based page index.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Requested page size.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Elements on this page.
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u64 {
        self.total_elements.div_ceil(u64::from(self.size.max(1)))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.number) + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomerSortKey, Order, Page, PageRequest, PageRequestError, Sort};

    fn request(page: u32, size: u32) -> PageRequest<CustomerSortKey> {
        PageRequest::of_size(page, size).unwrap()
    }

    #[test]
    fn zero_size_is_rejected() {
        assert_eq!(
            PageRequest::<CustomerSortKey>::of_size(0, 0),
            Err(PageRequestError::ZeroSize)
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Page::new(vec![1, 2], &request(0, 2), 2).total_pages(), 1);
        assert_eq!(Page::new(vec![1, 2], &request(0, 2), 5).total_pages(), 3);
        assert_eq!(Page::<i32>::new(vec![], &request(0, 2), 0).total_pages(), 0);
    }

    #[test]
    fn navigation_flags_follow_page_position() {
        let first = Page::new(vec![1, 2], &request(0, 2), 5);
        assert!(first.is_first());
        assert!(first.has_next());

        let last = Page::new(vec![5], &request(2, 2), 5);
        assert!(last.has_previous());
        assert!(last.is_last());
        assert_eq!(last.number_of_elements(), 1);
    }

    #[test]
    fn offset_and_next_keep_size_and_sort() {
        let sort = Sort::by([Order::asc(CustomerSortKey::LastName)]);
        let first = PageRequest::of(0, 3, sort.clone()).unwrap();
        let second = first.next();
        assert_eq!(second.page(), 1);
        assert_eq!(second.offset(), 3);
        assert_eq!(second.sort(), &sort);
    }

    #[test]
    fn order_by_sql_uses_column_names() {
        let sort = Sort::by([Order::asc(CustomerSortKey::LastName)])
            .and(Order::desc(CustomerSortKey::CreatedAt));
        assert_eq!(
            sort.to_order_by_sql(),
            " ORDER BY last_name ASC, created_at DESC"
        );
        assert_eq!(Sort::<CustomerSortKey>::unsorted().to_order_by_sql(), "");
    }

    #[test]
    fn map_preserves_totals() {
        let page = Page::new(vec![1, 2], &request(0, 2), 4).map(|value| value * 10);
        assert_eq!(page.content(), &[10, 20]);
        assert_eq!(page.total_elements(), 4);
    }
}
