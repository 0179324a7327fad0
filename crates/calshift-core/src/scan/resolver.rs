//! Classification of scan results into match types.
//!
//! Resolution runs in three phases over the whole registry:
//!
//! 1. Maps with exactly one candidate are UNIQUE.
//! 2. Maps are grouped by their exact source bytes. Within a group, free
//!    occurrences are paired with unresolved maps by address order when the
//!    counts agree (SEQUENTIAL); otherwise the maps are AMBIGUOUS.
//! 3. Axes of every resolved map are located.
//!
//! Each phase only reads the candidates written by the scan and the
//! classifications of earlier phases, so running `resolve` twice on the same
//! scan gives the same result.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::map::{AxisDef, AxisMatchType, AxisResolution, MapEntity, MapRegistry, MatchType};
use crate::scan::{ContextExpander, ContextMatch, PatternScanner, ScanConfig, SequentialPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResolver {
    expander: ContextExpander,
    policy: SequentialPolicy,
}

impl Default for MatchResolver {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl MatchResolver {
    pub fn new(expander: ContextExpander, policy: SequentialPolicy) -> Self {
        Self { expander, policy }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(ContextExpander::from_config(config), config.sequential)
    }

    fn scanner(&self) -> &PatternScanner {
        self.expander.scanner()
    }

    /// Scan one map's Z block and store its candidates.
    ///
    /// All output fields of the map are replaced in one assignment.
    pub fn scan_z(&self, entity: &mut MapEntity, source: &[u8], target: &[u8]) {
        let found = if entity.z.address > 0 {
            self.expander.scan_with_context(
                source,
                target,
                entity.z.address,
                entity.z.rows,
                entity.z.cols,
                entity.z.element.width,
            )
        } else {
            ContextMatch::default()
        };

        entity.reset_resolution();
        entity.resolution.match_count = found.matches.len();
        entity.resolution.matches = found.matches;
        entity.resolution.deep = found.deep;
    }

    /// Classify every scanned map and locate the axes of resolved ones
    pub fn resolve(&self, registry: &mut MapRegistry, source: &[u8], target: &[u8]) {
        let entities = registry.entities_mut();

        for entity in entities.iter_mut() {
            entity.resolution.clear_classification();
            entity.x_resolution = AxisResolution::default();
            entity.y_resolution = AxisResolution::default();
        }

        // Phase 1: immediate uniqueness
        for entity in entities.iter_mut() {
            if entity.z.address > 0 && entity.resolution.match_count == 1 {
                let addr = entity.resolution.matches[0];
                entity.resolution.assign(MatchType::Unique, addr, 100);
            }
        }

        // Phase 2: groups of identical source bytes
        let mut groups: BTreeMap<&[u8], Vec<usize>> = BTreeMap::new();
        for (i, entity) in entities.iter().enumerate() {
            if let Some(pattern) = entity.z_pattern(source) {
                groups.entry(pattern).or_default().push(i);
            }
        }
        for (pattern, members) in &groups {
            self.resolve_group(entities, pattern, members, target);
        }

        // Phase 3: axes
        for entity in entities.iter_mut() {
            self.resolve_axes(entity, source, target);
        }

        info!(
            "Resolved: {} unique, {} sequential, {} ambiguous, {} not found",
            registry.count_by_type(MatchType::Unique),
            registry.count_by_type(MatchType::Sequential),
            registry.count_by_type(MatchType::Ambiguous),
            registry.count_by_type(MatchType::None),
        );
    }

    fn resolve_group(
        &self,
        entities: &mut [MapEntity],
        pattern: &[u8],
        members: &[usize],
        target: &[u8],
    ) {
        // Deep matches narrowed to a single candidate
        for &i in members {
            let resolution = &mut entities[i].resolution;
            if resolution.match_type != MatchType::Unique
                && resolution.is_deep()
                && resolution.matches.len() == 1
            {
                let addr = resolution.matches[0];
                resolution.assign(MatchType::Unique, addr, 100);
            }
        }

        // An address claimed by two members is not unique for either
        let mut claims: HashMap<usize, usize> = HashMap::new();
        for &i in members {
            if let Some(addr) = entities[i].target_addr() {
                *claims.entry(addr).or_default() += 1;
            }
        }
        for &i in members {
            let Some(addr) = entities[i].target_addr() else {
                continue;
            };
            if claims.get(&addr).copied().unwrap_or(0) > 1 {
                debug!(
                    "  {}: 0x{:X} claimed by several maps, demoting",
                    entities[i].name, addr
                );
                entities[i].resolution.clear_classification();
            }
        }

        let mut unresolved: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&i| entities[i].match_type() != MatchType::Unique)
            .collect();
        if unresolved.is_empty() {
            return;
        }

        let raw = self.scanner().find_all(target, pattern);
        let capped = self.scanner().is_capped(&raw);
        let available: Vec<usize> = raw
            .into_iter()
            .filter(|addr| claims.get(addr).copied().unwrap_or(0) != 1)
            .collect();

        let counts_agree = !available.is_empty() && available.len() == unresolved.len();
        if counts_agree && !capped && self.policy.allows(members.len()) {
            unresolved.sort_by(|&a, &b| {
                (entities[a].z.address, &entities[a].name)
                    .cmp(&(entities[b].z.address, &entities[b].name))
            });
            for (&i, &addr) in unresolved.iter().zip(&available) {
                debug!(
                    "  {}: 0x{:X} -> 0x{:X} (sequential, group of {})",
                    entities[i].name,
                    entities[i].z.address,
                    addr,
                    members.len()
                );
                entities[i]
                    .resolution
                    .assign(MatchType::Sequential, addr, 100);
            }
            return;
        }

        for &i in &unresolved {
            let resolution = &mut entities[i].resolution;
            resolution.match_type = if resolution.match_count == 0 {
                MatchType::None
            } else {
                MatchType::Ambiguous
            };
            resolution.match_percent = 0;
        }
        if !available.is_empty() {
            debug!(
                "  {} maps share a pattern with {} free occurrences{}",
                unresolved.len(),
                available.len(),
                if capped { " (capped)" } else { "" }
            );
        }
    }

    /// Locate both axes of a resolved map; no-op for unresolved maps
    pub fn resolve_axes(&self, entity: &mut MapEntity, source: &[u8], target: &[u8]) {
        let Some(target_addr) = entity.target_addr() else {
            return;
        };
        let shift = target_addr as i64 - entity.z.address as i64;
        entity.x_resolution = self.resolve_axis(&entity.x, shift, source, target);
        entity.y_resolution = self.resolve_axis(&entity.y, shift, source, target);
    }

    fn resolve_axis(
        &self,
        axis: &AxisDef,
        shift: i64,
        source: &[u8],
        target: &[u8],
    ) -> AxisResolution {
        if !axis.is_defined() {
            return AxisResolution::default();
        }

        let found = self.expander.scan_with_context(
            source,
            target,
            axis.address,
            1,
            axis.count,
            axis.element.width,
        );

        let shifted = usize::try_from(axis.address as i64 + shift).ok();
        let (match_type, target_addr) = match found.matches.as_slice() {
            [] => (AxisMatchType::None, None),
            [only] => (AxisMatchType::Unique, Some(*only)),
            [first, ..] => match shifted {
                Some(addr) if found.matches.binary_search(&addr).is_ok() => {
                    (AxisMatchType::Offset, Some(addr))
                }
                _ => (AxisMatchType::Guess, Some(*first)),
            },
        };

        AxisResolution {
            target_addr,
            match_type,
            matches: found.matches,
            deep: found.deep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapKind, ZData};
    use crate::memory::{Element, ElementWidth};

    const PATTERN: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

    fn resolver() -> MatchResolver {
        MatchResolver::from_config(&ScanConfig::builder().reserved_region(0).build())
    }

    fn table(name: &str, address: usize, len: usize) -> MapEntity {
        MapEntity::new(
            name,
            MapKind::Table,
            ZData {
                address,
                rows: 1,
                cols: len,
                ..Default::default()
            },
        )
    }

    fn registry(entities: Vec<MapEntity>) -> MapRegistry {
        let mut registry = MapRegistry::new();
        for entity in entities {
            registry.insert(entity).unwrap();
        }
        registry
    }

    fn run(resolver: &MatchResolver, registry: &mut MapRegistry, source: &[u8], target: &[u8]) {
        for entity in registry.iter_mut() {
            resolver.scan_z(entity, source, target);
        }
        resolver.resolve(registry, source, target);
    }

    fn place(buffer: &mut [u8], at: &[usize]) {
        for &addr in at {
            buffer[addr..addr + PATTERN.len()].copy_from_slice(&PATTERN);
        }
    }

    #[test]
    fn test_two_maps_two_occurrences_are_sequential() {
        let mut source = vec![0u8; 64];
        place(&mut source, &[10, 20]);
        let mut target = vec![0u8; 512];
        place(&mut target, &[100, 200]);

        let mut registry = registry(vec![table("B", 20, 4), table("A", 10, 4)]);
        run(&resolver(), &mut registry, &source, &target);

        let a = registry.get("A").unwrap();
        let b = registry.get("B").unwrap();
        assert_eq!(a.match_type(), MatchType::Sequential);
        assert_eq!(a.target_addr(), Some(100));
        assert_eq!(b.match_type(), MatchType::Sequential);
        assert_eq!(b.target_addr(), Some(200));
        assert_eq!(a.resolution.match_percent, 100);
    }

    #[test]
    fn test_two_maps_three_occurrences_are_ambiguous() {
        let mut source = vec![0u8; 64];
        place(&mut source, &[10, 20]);
        let mut target = vec![0u8; 512];
        place(&mut target, &[100, 200, 300]);

        let mut registry = registry(vec![table("A", 10, 4), table("B", 20, 4)]);
        run(&resolver(), &mut registry, &source, &target);

        for entity in registry.iter() {
            assert_eq!(entity.match_type(), MatchType::Ambiguous);
            assert_eq!(entity.resolution.target_or_sentinel(), -1);
            assert_eq!(entity.resolution.match_percent, 0);
        }
    }

    #[test]
    fn test_strict_policy_demotes_small_groups() {
        let mut source = vec![0u8; 64];
        place(&mut source, &[10, 20]);
        let mut target = vec![0u8; 512];
        place(&mut target, &[100, 200]);

        let strict = MatchResolver::from_config(
            &ScanConfig::builder()
                .reserved_region(0)
                .sequential(SequentialPolicy::Strict { min_group_size: 3 })
                .build(),
        );
        let mut registry = registry(vec![table("A", 10, 4), table("B", 20, 4)]);
        run(&strict, &mut registry, &source, &target);

        assert_eq!(registry.count_by_type(MatchType::Ambiguous), 2);
    }

    #[test]
    fn test_deep_unique_frees_occurrence_for_sequential_partner() {
        // A has a distinctive left neighbour, B's neighbours match neither occurrence
        let mut source = vec![0u8; 64];
        source[9] = 0xEE;
        place(&mut source, &[10, 30]);
        source[29] = 0x99;
        source[34] = 0x99;
        let mut target = vec![0u8; 512];
        target[299] = 0xEE;
        place(&mut target, &[100, 300]);

        let mut registry = registry(vec![table("A", 10, 4), table("B", 30, 4)]);
        run(&resolver(), &mut registry, &source, &target);

        let a = registry.get("A").unwrap();
        assert_eq!(a.match_type(), MatchType::Unique);
        assert_eq!(a.target_addr(), Some(300));
        assert!(a.resolution.is_deep());

        let b = registry.get("B").unwrap();
        assert_eq!(b.match_type(), MatchType::Sequential);
        assert_eq!(b.target_addr(), Some(100));
    }

    #[test]
    fn test_single_occurrence_shared_by_two_maps_is_ambiguous() {
        let mut source = vec![0u8; 64];
        place(&mut source, &[10, 20]);
        let mut target = vec![0u8; 512];
        place(&mut target, &[100]);

        let mut registry = registry(vec![table("A", 10, 4), table("B", 20, 4)]);
        run(&resolver(), &mut registry, &source, &target);

        for entity in registry.iter() {
            assert_eq!(entity.resolution.match_count, 1);
            assert_eq!(entity.match_type(), MatchType::Ambiguous);
            assert_eq!(entity.target_addr(), None);
            assert_eq!(entity.resolution.match_percent, 0);
        }
    }

    #[test]
    fn test_contested_deep_claim_returns_to_sequential_pool() {
        // A and B share a left neighbour found only before 200; C's is found nowhere
        let mut source = vec![0u8; 64];
        place(&mut source, &[10, 20, 40]);
        source[9] = 0xEE;
        source[19] = 0xEE;
        source[39] = 0x77;
        let mut target = vec![0u8; 512];
        place(&mut target, &[100, 200, 300]);
        target[199] = 0xEE;

        let mut registry = registry(vec![table("C", 40, 4), table("B", 20, 4), table("A", 10, 4)]);
        let resolver = resolver();
        for entity in registry.iter_mut() {
            resolver.scan_z(entity, &source, &target);
        }
        assert_eq!(registry.get("A").unwrap().resolution.matches, vec![200]);
        assert_eq!(registry.get("B").unwrap().resolution.matches, vec![200]);
        assert_eq!(registry.get("C").unwrap().resolution.match_count, 3);

        resolver.resolve(&mut registry, &source, &target);
        let placed: Vec<(MatchType, Option<usize>)> = ["A", "B", "C"]
            .iter()
            .map(|name| {
                let map = registry.get(name).unwrap();
                (map.match_type(), map.target_addr())
            })
            .collect();
        assert_eq!(
            placed,
            vec![
                (MatchType::Sequential, Some(100)),
                (MatchType::Sequential, Some(200)),
                (MatchType::Sequential, Some(300)),
            ]
        );
    }

    #[test]
    fn test_missing_pattern_is_none() {
        let mut source = vec![0u8; 64];
        place(&mut source, &[10]);
        let target = vec![0u8; 512];

        let mut registry = registry(vec![table("A", 10, 4), table("ZERO", 0, 4)]);
        run(&resolver(), &mut registry, &source, &target);

        assert_eq!(registry.get("A").unwrap().match_type(), MatchType::None);
        assert_eq!(registry.get("ZERO").unwrap().match_type(), MatchType::None);
        assert_eq!(registry.get("ZERO").unwrap().resolution.match_count, 0);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut source = vec![0u8; 64];
        place(&mut source, &[10, 20]);
        let mut target = vec![0u8; 512];
        place(&mut target, &[100, 200]);

        let resolver = resolver();
        let mut registry = registry(vec![table("A", 10, 4), table("B", 20, 4)]);
        run(&resolver, &mut registry, &source, &target);
        let first: Vec<_> = registry.iter().map(|e| e.resolution.clone()).collect();

        resolver.resolve(&mut registry, &source, &target);
        let second: Vec<_> = registry.iter().map(|e| e.resolution.clone()).collect();
        assert_eq!(first, second);

        run(&resolver, &mut registry, &source, &target);
        let third: Vec<_> = registry.iter().map(|e| e.resolution.clone()).collect();
        assert_eq!(first, third);
    }

    #[test]
    fn test_resolved_targets_are_injective_within_group() {
        let mut source = vec![0u8; 128];
        place(&mut source, &[10, 40, 70]);
        let mut target = vec![0u8; 1024];
        place(&mut target, &[300, 500, 700]);

        let mut registry = registry(vec![
            table("A", 10, 4),
            table("B", 40, 4),
            table("C", 70, 4),
        ]);
        run(&resolver(), &mut registry, &source, &target);

        let mut targets: Vec<usize> = registry.iter().filter_map(|e| e.target_addr()).collect();
        assert_eq!(targets.len(), 3);
        targets.dedup();
        assert_eq!(targets, vec![300, 500, 700]);
    }

    #[test]
    fn test_target_addr_iff_resolved_type() {
        let mut source = vec![0u8; 128];
        place(&mut source, &[10, 20]);
        source[60..64].copy_from_slice(&[0xC0, 0xC1, 0xC2, 0xC3]);
        let mut target = vec![0u8; 1024];
        place(&mut target, &[100, 200, 300]);
        target[600..604].copy_from_slice(&[0xC0, 0xC1, 0xC2, 0xC3]);

        let mut registry = registry(vec![
            table("A", 10, 4),
            table("B", 20, 4),
            table("C", 60, 4),
            table("D", 90, 4),
        ]);
        run(&resolver(), &mut registry, &source, &target);

        for entity in registry.iter() {
            assert_eq!(
                entity.target_addr().is_some(),
                entity.match_type().is_resolved(),
                "{}",
                entity.name
            );
        }
        assert_eq!(registry.get("C").unwrap().match_type(), MatchType::Unique);
    }

    #[test]
    fn test_axis_resolution_types() {
        let mut source = vec![0u8; 256];
        // Z block, unique
        source[100..104].copy_from_slice(&[0xD0, 0xD1, 0xD2, 0xD3]);
        // X axis, unique
        source[80..83].copy_from_slice(&[0x01, 0x05, 0x09]);
        // Y axis, occurs twice in the target, one at the table's shift
        source[40..43].copy_from_slice(&[0x02, 0x06, 0x0A]);

        let mut target = vec![0u8; 1024];
        target[600..604].copy_from_slice(&[0xD0, 0xD1, 0xD2, 0xD3]);
        target[400..403].copy_from_slice(&[0x01, 0x05, 0x09]);
        target[300..303].copy_from_slice(&[0x02, 0x06, 0x0A]);
        target[540..543].copy_from_slice(&[0x02, 0x06, 0x0A]);

        let axis = |address, count| AxisDef {
            address,
            count,
            element: Element::new(ElementWidth::Byte, false),
            ..Default::default()
        };
        let map = table("KFZW", 100, 4).with_axes(axis(80, 3), axis(40, 3));
        let mut registry = registry(vec![map]);
        run(&resolver(), &mut registry, &source, &target);

        let map = registry.get("KFZW").unwrap();
        assert_eq!(map.target_addr(), Some(600));
        assert_eq!(map.x_resolution.match_type, AxisMatchType::Unique);
        assert_eq!(map.x_resolution.target_addr, Some(400));
        // shift is +500, so 40 -> 540
        assert_eq!(map.y_resolution.match_type, AxisMatchType::Offset);
        assert_eq!(map.y_resolution.target_addr, Some(540));
    }

    #[test]
    fn test_axis_guess_and_none() {
        let mut source = vec![0u8; 256];
        source[100..104].copy_from_slice(&[0xD0, 0xD1, 0xD2, 0xD3]);
        source[80..83].copy_from_slice(&[0x01, 0x05, 0x09]);
        source[90..93].copy_from_slice(&[0x02, 0x06, 0x0A]);

        let mut target = vec![0u8; 1024];
        target[600..604].copy_from_slice(&[0xD0, 0xD1, 0xD2, 0xD3]);
        // X axis twice, neither at the table's shift
        target[200..203].copy_from_slice(&[0x01, 0x05, 0x09]);
        target[800..803].copy_from_slice(&[0x01, 0x05, 0x09]);
        // Y axis absent

        let axis = |address| AxisDef {
            address,
            count: 3,
            ..Default::default()
        };
        let map = table("KFZW", 100, 4).with_axes(axis(80), axis(90));
        let mut registry = registry(vec![map]);
        run(&resolver(), &mut registry, &source, &target);

        let map = registry.get("KFZW").unwrap();
        assert_eq!(map.x_resolution.match_type, AxisMatchType::Guess);
        assert_eq!(map.x_resolution.target_addr, Some(200));
        assert_eq!(map.y_resolution.match_type, AxisMatchType::None);
        assert_eq!(map.y_resolution.target_addr, None);
    }

    #[test]
    fn test_axes_skipped_for_unresolved_maps() {
        let source = vec![0x42u8; 64];
        let target = vec![0u8; 256];
        let axis = AxisDef {
            address: 4,
            count: 2,
            ..Default::default()
        };
        let map = table("KFZW", 10, 4).with_axes(axis.clone(), axis);
        let mut registry = registry(vec![map]);
        run(&resolver(), &mut registry, &source, &target);

        let map = registry.get("KFZW").unwrap();
        assert_eq!(map.match_type(), MatchType::None);
        assert_eq!(map.x_resolution, AxisResolution::default());
    }
}
