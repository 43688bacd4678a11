//! Export planning: everything computed before any tracking write.
//!
//! The planner runs collation, composite building, and range calculation for
//! every item of a run, then assigns cut order once all heroes are known.

use cutsync_common::{CutsyncError, CutsyncResult, ExportSettings};
use cutsync_timeline::{ItemId, Sequence, TrackItem};
use serde::Serialize;

use crate::collate::{collate, CollateOptions, CollationGroup};
use crate::composite::{CompositeBuilder, CompositeSequence};
use crate::cut_range::{CutRangeRecord, RangeCalculator};
use crate::ordering::assign_cut_order;
use crate::warning::ExportWarning;

/// The computed outcome for one exported item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemPlan {
    pub item: ItemId,
    pub name: String,

    /// Index into [`ExportPlan::groups`] when collated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    pub is_hero: bool,
    pub record: CutRangeRecord,

    /// Set for items whose record is persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_order: Option<u32>,
    pub warnings: Vec<ExportWarning>,
}

impl ItemPlan {
    pub fn is_collated(&self) -> bool {
        self.group.is_some()
    }

    /// Only heroes and non-collated items reach the tracking service.
    pub fn persists(&self) -> bool {
        !self.is_collated() || self.is_hero
    }

    /// The item whose shot published media is filed against.
    pub fn publish_item(&self) -> ItemId {
        self.record.group_hero.unwrap_or(self.item)
    }
}

/// A collation group together with its composite.
#[derive(Debug, Clone)]
pub struct PlannedGroup {
    pub group: CollationGroup,
    pub composite: CompositeSequence,
}

/// What the host renders for an item.
#[derive(Debug, Clone, Copy)]
pub enum RenderSource<'a> {
    Composite(&'a CompositeSequence),
    Item(&'a TrackItem),
}

/// All items of one export run.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub sequence_name: String,
    pub items: Vec<ItemPlan>,
    pub groups: Vec<PlannedGroup>,
}

impl ExportPlan {
    pub fn item(&self, id: ItemId) -> Option<&ItemPlan> {
        self.items.iter().find(|plan| plan.item == id)
    }

    /// Persisted items in cut order.
    pub fn persisted(&self) -> Vec<&ItemPlan> {
        let mut persisted: Vec<&ItemPlan> =
            self.items.iter().filter(|plan| plan.persists()).collect();
        persisted.sort_by_key(|plan| plan.cut_order);
        persisted
    }

    pub fn composite_for(&self, id: ItemId) -> Option<&CompositeSequence> {
        self.item(id)
            .and_then(|plan| plan.group)
            .and_then(|index| self.groups.get(index))
            .map(|planned| &planned.composite)
    }

    /// The composite for collated items, otherwise the original item.
    pub fn render_source<'a>(&'a self, sequence: &'a Sequence, id: ItemId) -> Option<RenderSource<'a>> {
        match self.composite_for(id) {
            Some(composite) => Some(RenderSource::Composite(composite)),
            None => sequence.find_item(id).map(RenderSource::Item),
        }
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().map(|plan| plan.warnings.len()).sum()
    }
}

/// Builds [`ExportPlan`]s from export settings.
#[derive(Debug, Clone)]
pub struct ExportPlanner {
    options: CollateOptions,
    builder: CompositeBuilder,
    calculator: RangeCalculator,
}

impl ExportPlanner {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            options: CollateOptions::from(settings),
            builder: CompositeBuilder::new(settings),
            calculator: RangeCalculator::new(settings),
        }
    }

    /// Plan the export of `items` from `sequence`.
    ///
    /// Each item is collated on its own. Items whose collation yields the
    /// same member set share one group and one composite.
    pub fn plan(&self, sequence: &Sequence, items: &[ItemId]) -> CutsyncResult<ExportPlan> {
        let mut groups: Vec<PlannedGroup> = vec![];
        let mut plans: Vec<ItemPlan> = Vec::with_capacity(items.len());

        for &id in items {
            let item = sequence.find_item(id).ok_or_else(|| {
                CutsyncError::precondition(format!(
                    "item {id} is not in sequence '{}'",
                    sequence.name
                ))
            })?;

            let mut warnings = vec![];
            let group_index = if self.options.is_enabled() {
                match collate(sequence, id, self.options)? {
                    Some(group) => Some(self.group_index(sequence, group, &mut groups, &mut warnings)?),
                    None => None,
                }
            } else {
                None
            };

            let composite = group_index.map(|index| &groups[index].composite);
            let calculated = self.calculator.calculate(sequence, id, composite)?;
            warnings.extend(calculated.warnings);

            plans.push(ItemPlan {
                item: id,
                name: item.name.clone(),
                group: group_index,
                is_hero: group_index.map_or(false, |index| groups[index].group.is_hero(id)),
                record: calculated.record,
                cut_order: None,
                warnings,
            });
        }

        let order_input: Vec<(ItemId, i64)> = plans
            .iter()
            .filter(|plan| plan.persists())
            .filter_map(|plan| sequence.find_item(plan.item).map(|item| (plan.item, item.timeline_in)))
            .collect();
        for (id, order) in assign_cut_order(&order_input) {
            if let Some(plan) = plans.iter_mut().find(|plan| plan.item == id) {
                plan.cut_order = Some(order);
            }
        }

        tracing::info!(
            "Planned {} items from '{}': {} groups, {} persisted",
            plans.len(),
            sequence.name,
            groups.len(),
            order_input.len()
        );

        Ok(ExportPlan {
            sequence_name: sequence.name.clone(),
            items: plans,
            groups,
        })
    }

    /// Reuse the group with the same members or build a new composite.
    /// Collation conflicts are reported on the item that triggered the
    /// build.
    fn group_index(
        &self,
        sequence: &Sequence,
        group: CollationGroup,
        groups: &mut Vec<PlannedGroup>,
        warnings: &mut Vec<ExportWarning>,
    ) -> CutsyncResult<usize> {
        if let Some(index) = groups
            .iter()
            .position(|planned| planned.group.members() == group.members())
        {
            return Ok(index);
        }

        let composite = self.builder.build(sequence, &group)?;
        warnings.extend(
            composite
                .conflicts
                .iter()
                .cloned()
                .map(ExportWarning::CollationConflict),
        );
        groups.push(PlannedGroup { group, composite });
        Ok(groups.len() - 1)
    }
}
