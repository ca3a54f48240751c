use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::geo::{Coordinate, GroupKey};
use crate::marker::DisplayMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Employment,
    Project,
}

/// Index back into the resume data the record was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordRef {
    Job(usize),
    Project(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRecord {
    pub kind: RecordKind,
    pub coordinates: Coordinate,
    pub payload: RecordRef,
}

/// All records collapsed onto one map point.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub key: GroupKey,
    /// Coordinates of the first record seen at this key.
    pub position: Coordinate,
    pub employment_records: Vec<LocationRecord>,
    pub project_records: Vec<LocationRecord>,
}

impl MarkerGroup {
    fn new(key: GroupKey, position: Coordinate) -> Self {
        Self {
            key,
            position,
            employment_records: Vec::new(),
            project_records: Vec::new(),
        }
    }

    pub fn has_employment(&self) -> bool {
        !self.employment_records.is_empty()
    }

    pub fn has_projects(&self) -> bool {
        !self.project_records.is_empty()
    }

    /// Only groups carrying both kinds can switch display mode.
    pub fn supports_toggle(&self) -> bool {
        self.has_employment() && self.has_projects()
    }

    pub fn initial_mode(&self) -> DisplayMode {
        if !self.has_employment() && self.has_projects() {
            DisplayMode::Project
        } else {
            DisplayMode::Employment
        }
    }
}

pub struct LocationRegistry;

impl LocationRegistry {
    /// Groups records by rounded coordinates.
    ///
    /// Groups come out in first-seen order and records keep their input order inside
    /// a group. Records with unusable coordinates are skipped.
    pub fn build(records: &[LocationRecord]) -> Vec<MarkerGroup> {
        let mut groups: Vec<MarkerGroup> = Vec::new();
        let mut index_by_key: HashMap<GroupKey, usize> = HashMap::new();

        for record in records {
            if !record.coordinates.is_valid() {
                debug!(
                    "Skipping {:?} with unusable coordinates {:?}",
                    record.payload, record.coordinates
                );
                continue;
            }

            let key = record.coordinates.key();
            let slot = *index_by_key.entry(key).or_insert_with(|| {
                debug!("New marker group at {}", key);
                groups.push(MarkerGroup::new(key, record.coordinates));
                groups.len() - 1
            });

            let group = &mut groups[slot];
            match record.kind {
                RecordKind::Employment => group.employment_records.push(*record),
                RecordKind::Project => group.project_records.push(*record),
            }
        }

        debug!(
            "Grouped {} records into {} markers",
            records.len(),
            groups.len()
        );
        groups
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(usize);

impl MarkerId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct MarkerEntry {
    group: MarkerGroup,
    mode: DisplayMode,
}

/// Side table holding each rendered marker's group and current display mode.
///
/// Rendered widgets only carry a [`MarkerId`]; all interaction state lives here.
#[derive(Debug, Default)]
pub struct MarkerTable {
    entries: Vec<MarkerEntry>,
}

pub type SharedMarkers = Rc<RefCell<MarkerTable>>;

impl MarkerTable {
    pub fn from_groups(groups: Vec<MarkerGroup>) -> Self {
        let mut table = Self::default();
        table.rebuild(groups);
        table
    }

    pub fn shared(groups: Vec<MarkerGroup>) -> SharedMarkers {
        Rc::new(RefCell::new(Self::from_groups(groups)))
    }

    /// Replaces the whole marker set; every mode restarts from its initial value.
    pub fn rebuild(&mut self, groups: Vec<MarkerGroup>) {
        self.entries = groups
            .into_iter()
            .map(|group| MarkerEntry {
                mode: group.initial_mode(),
                group,
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = MarkerId> {
        (0..self.entries.len()).map(MarkerId)
    }

    pub fn group(&self, id: MarkerId) -> Option<&MarkerGroup> {
        self.entries.get(id.0).map(|entry| &entry.group)
    }

    pub fn mode(&self, id: MarkerId) -> Option<DisplayMode> {
        self.entries.get(id.0).map(|entry| entry.mode)
    }

    pub(crate) fn set_mode(&mut self, id: MarkerId, mode: DisplayMode) {
        if let Some(entry) = self.entries.get_mut(id.0) {
            entry.mode = mode;
        }
    }

    pub fn position(&self, id: MarkerId) -> Option<Coordinate> {
        self.group(id).map(|group| group.position)
    }

    /// Matches requested coordinates to markers within the grouping tolerance.
    ///
    /// Unmatched coordinates are skipped; each marker appears at most once.
    pub fn resolve(&self, coordinates: &[Coordinate]) -> Vec<MarkerId> {
        let mut matched = Vec::new();
        for coordinate in coordinates {
            let hit = self
                .entries
                .iter()
                .position(|entry| entry.group.position.approx_eq(coordinate))
                .map(MarkerId);
            match hit {
                Some(id) if !matched.contains(&id) => matched.push(id),
                Some(_) => {}
                None => debug!("No marker near {:?}", coordinate),
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn record(lat: f64, lng: f64, kind: RecordKind, index: usize) -> LocationRecord {
        let payload = match kind {
            RecordKind::Employment => RecordRef::Job(index),
            RecordKind::Project => RecordRef::Project(index),
        };
        LocationRecord {
            kind,
            coordinates: Coordinate::new(lat, lng),
            payload,
        }
    }

    #[test]
    fn near_duplicates_merge_into_one_group() {
        let groups = LocationRegistry::build(&[
            record(59.91, 10.75, RecordKind::Employment, 0),
            record(59.9100, 10.7500, RecordKind::Project, 0),
        ]);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.employment_records.len(), 1);
        assert_eq!(group.project_records.len(), 1);
        assert_eq!(group.initial_mode(), DisplayMode::Employment);
        assert!(group.supports_toggle());
    }

    #[test]
    fn partitions_by_kind_and_keeps_input_order() {
        let groups = LocationRegistry::build(&[
            record(60.39, 5.32, RecordKind::Project, 3),
            record(59.91, 10.75, RecordKind::Employment, 0),
            record(60.39, 5.32, RecordKind::Employment, 1),
            record(60.390_01, 5.320_01, RecordKind::Project, 7),
        ]);

        assert_eq!(groups.len(), 2);
        let bergen = &groups[0];
        assert_eq!(bergen.position, Coordinate::new(60.39, 5.32));
        assert_eq!(
            bergen
                .project_records
                .iter()
                .map(|r| r.payload)
                .collect::<Vec<_>>(),
            vec![RecordRef::Project(3), RecordRef::Project(7)]
        );
        assert_eq!(bergen.employment_records[0].payload, RecordRef::Job(1));
        assert_eq!(groups[1].employment_records[0].payload, RecordRef::Job(0));
    }

    #[test]
    fn project_only_group_starts_in_project_mode() {
        let groups = LocationRegistry::build(&[record(63.43, 10.39, RecordKind::Project, 0)]);
        assert_eq!(groups[0].initial_mode(), DisplayMode::Project);
        assert!(!groups[0].supports_toggle());
    }

    #[test]
    fn invalid_coordinates_are_skipped() {
        let groups = LocationRegistry::build(&[
            record(f64::NAN, 10.0, RecordKind::Employment, 0),
            record(95.0, 10.0, RecordKind::Project, 1),
            record(10.0, 10.0, RecordKind::Project, 2),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].project_records[0].payload, RecordRef::Project(2));
    }

    #[test]
    fn resolve_tolerates_independent_sourcing() {
        let table = MarkerTable::from_groups(LocationRegistry::build(&[
            record(59.9139, 10.7522, RecordKind::Employment, 0),
            record(55.6761, 12.5683, RecordKind::Employment, 1),
        ]));

        let ids = table.resolve(&[
            Coordinate::new(55.67615, 12.56825),
            Coordinate::new(59.9139, 10.7522),
            Coordinate::new(59.91391, 10.75221),
            Coordinate::new(40.0, -74.0),
        ]);
        assert_eq!(ids, vec![MarkerId(1), MarkerId(0)]);
    }

    #[test]
    fn rebuild_resets_modes() {
        let groups = LocationRegistry::build(&[
            record(59.91, 10.75, RecordKind::Employment, 0),
            record(59.91, 10.75, RecordKind::Project, 0),
        ]);
        let mut table = MarkerTable::from_groups(groups.clone());
        let id = table.ids().next().unwrap();
        table.set_mode(id, DisplayMode::Project);
        table.rebuild(groups);
        assert_eq!(table.mode(id), Some(DisplayMode::Employment));
    }

    const SITES: [(f64, f64); 4] = [(59.91, 10.75), (60.39, 5.32), (55.6761, 12.5683), (-33.8688, 151.2093)];

    fn records() -> impl Strategy<Value = Vec<LocationRecord>> {
        prop::collection::vec((0..SITES.len(), -0.00004f64..0.00004, any::<bool>()), 0..24).prop_map(
            |picks| {
                picks
                    .into_iter()
                    .enumerate()
                    .map(|(index, (site, jitter, is_job))| {
                        let (lat, lng) = SITES[site];
                        let kind = if is_job {
                            RecordKind::Employment
                        } else {
                            RecordKind::Project
                        };
                        record(lat + jitter, lng - jitter, kind, index)
                    })
                    .collect()
            },
        )
    }

    fn input_index(record: &LocationRecord) -> usize {
        match record.payload {
            RecordRef::Job(index) | RecordRef::Project(index) => index,
        }
    }

    proptest! {
        #[test]
        fn proptest_groups_partition_records_by_key_and_kind(records in records()) {
            let groups = LocationRegistry::build(&records);

            let grouped: usize = groups
                .iter()
                .map(|g| g.employment_records.len() + g.project_records.len())
                .sum();
            prop_assert_eq!(grouped, records.len());

            let mut first_seen: Vec<GroupKey> = Vec::new();
            for record in &records {
                if !first_seen.contains(&record.coordinates.key()) {
                    first_seen.push(record.coordinates.key());
                }
            }
            let keys: Vec<GroupKey> = groups.iter().map(|g| g.key).collect();
            prop_assert_eq!(keys, first_seen);

            for group in &groups {
                prop_assert!(group.has_employment() || group.has_projects());
                prop_assert_eq!(group.position.key(), group.key);
                for record in &group.employment_records {
                    prop_assert_eq!(record.kind, RecordKind::Employment);
                    prop_assert_eq!(record.coordinates.key(), group.key);
                }
                for record in &group.project_records {
                    prop_assert_eq!(record.kind, RecordKind::Project);
                    prop_assert_eq!(record.coordinates.key(), group.key);
                }
                let order: Vec<usize> = group
                    .employment_records
                    .iter()
                    .chain(&group.project_records)
                    .map(input_index)
                    .collect();
                let (jobs, projects) = order.split_at(group.employment_records.len());
                prop_assert!(jobs.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(projects.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
