use super::row::Row;

/// One step from a row to a related object
pub type Hop = for<'a> fn(Row<'a>) -> Option<Row<'a>>;

/// Path from a table's row to the object a column reads from.
///
/// An empty path reads the row itself. Each hop may fail (wrong row kind,
/// the default row, a dangling relation), in which case the column yields its
/// neutral value.
#[derive(Clone, Default)]
pub struct ColumnOffsets {
    hops: Vec<Hop>,
}

impl ColumnOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new path extending this one by one hop
    pub fn add(&self, hop: Hop) -> Self {
        let mut hops = self.hops.clone();
        hops.push(hop);
        Self { hops }
    }

    pub fn resolve<'a>(&self, row: Row<'a>) -> Option<Row<'a>> {
        self.hops.iter().try_fold(row, |row, hop| hop(row))
    }

    pub fn depth(&self) -> usize {
        self.hops.len()
    }
}

impl std::fmt::Debug for ColumnOffsets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnOffsets")
            .field("depth", &self.hops.len())
            .finish()
    }
}

/// service -> host
pub fn service_host<'a>(row: Row<'a>) -> Option<Row<'a>> {
    row.service().map(|s| Row::Host(&s.host))
}

/// log entry -> host it mentions, if that host still exists
pub fn log_host<'a>(row: Row<'a>) -> Option<Row<'a>> {
    row.log().and_then(|l| l.host.as_deref()).map(Row::Host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{Host, Service};
    use std::sync::Arc;

    fn service_on(host: &Arc<Host>) -> Service {
        Service {
            host: Arc::clone(host),
            description: "HTTP".into(),
            display_name: String::new(),
            contacts: vec![],
            groups: vec![],
            attributes: Default::default(),
            check: Default::default(),
        }
    }

    #[test]
    fn test_empty_path_is_identity() {
        let host = Host {
            name: "web01".into(),
            ..Default::default()
        };
        let resolved = ColumnOffsets::new().resolve(Row::Host(&host));
        assert_eq!(resolved.and_then(|r| r.host()).map(|h| h.name.as_str()), Some("web01"));
    }

    #[test]
    fn test_service_to_host_hop() {
        let host = Arc::new(Host {
            name: "web01".into(),
            ..Default::default()
        });
        let service = service_on(&host);
        let offsets = ColumnOffsets::new().add(service_host);
        assert_eq!(offsets.depth(), 1);

        let resolved = offsets.resolve(Row::Service(&service)).and_then(|r| r.host());
        assert_eq!(resolved.map(|h| h.name.as_str()), Some("web01"));
    }

    #[test]
    fn test_hop_on_wrong_row_kind_fails_softly() {
        let offsets = ColumnOffsets::new().add(service_host);
        assert!(offsets.resolve(Row::Default).is_none());

        let host = Host::default();
        assert!(offsets.resolve(Row::Host(&host)).is_none());
    }
}
