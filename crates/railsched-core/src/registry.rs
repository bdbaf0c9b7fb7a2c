use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::condition::{
    FluidThresholdCondition, IdleCargoCondition, ItemThresholdCondition, PlayerCountCondition,
    RedstoneLinkCondition, ScheduleCondition, ScheduledDelay, StationPoweredCondition,
    StationUnloadedCondition, TimeOfDayCondition,
};
use crate::error::{Result, ScheduleError};
use crate::ident::Identifier;
use crate::instruction::{
    DestinationInstruction, RenameInstruction, ScheduleInstruction, ThrottleInstruction,
};

/// Zero-argument constructor for a registered instruction kind.
pub type InstructionFactory = fn() -> Box<dyn ScheduleInstruction>;

/// Zero-argument constructor for a registered condition kind.
pub type ConditionFactory = fn() -> Box<dyn ScheduleCondition>;

// ---------------------------------------------------------------------------
// Catalog / ConditionRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    Instructions,
    WaitConditions,
    SkipConditions,
}

impl Catalog {
    pub fn as_str(self) -> &'static str {
        match self {
            Catalog::Instructions => "instructions",
            Catalog::WaitConditions => "wait_conditions",
            Catalog::SkipConditions => "skip_conditions",
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which condition catalogs a condition kind is registered into: the same
/// kind can gate progression (wait) and bypass an entry (skip).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionRole {
    Wait,
    Skip,
}

impl ConditionRole {
    pub fn catalog(self) -> Catalog {
        match self {
            ConditionRole::Wait => Catalog::WaitConditions,
            ConditionRole::Skip => Catalog::SkipConditions,
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduleRegistry
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RegistryEntry<F> {
    id: Identifier,
    factory: F,
    /// `TypeId` of the factory's product, for identifier recovery when an
    /// entry is written.
    product: TypeId,
}

/// Append-only catalog of instruction and condition kinds.
///
/// Populated once at startup, read-only and freely shareable afterwards.
/// Registration order is preserved and user-visible: it drives selection
/// lists and the localization keys of `choice_labels`.
#[derive(Debug, Default)]
pub struct ScheduleRegistry {
    instructions: Vec<RegistryEntry<InstructionFactory>>,
    wait_conditions: Vec<RegistryEntry<ConditionFactory>>,
    skip_conditions: Vec<RegistryEntry<ConditionFactory>>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin variant set, in its canonical registration order.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        // Paths below are statically distinct, so the duplicate check of
        // the public register methods is not needed.
        reg.add_instruction("destination", || Box::<DestinationInstruction>::default());
        reg.add_instruction("rename", || Box::<RenameInstruction>::default());
        reg.add_instruction("throttle", || Box::<ThrottleInstruction>::default());

        use ConditionRole::{Skip, Wait};
        reg.add_condition("delay", || Box::<ScheduledDelay>::default(), &[Wait]);
        reg.add_condition(
            "time_of_day",
            || Box::<TimeOfDayCondition>::default(),
            &[Wait],
        );
        reg.add_condition(
            "fluid_threshold",
            || Box::<FluidThresholdCondition>::default(),
            &[Wait, Skip],
        );
        reg.add_condition(
            "item_threshold",
            || Box::<ItemThresholdCondition>::default(),
            &[Wait, Skip],
        );
        reg.add_condition(
            "redstone_link",
            || Box::<RedstoneLinkCondition>::default(),
            &[Wait, Skip],
        );
        reg.add_condition(
            "player_count",
            || Box::<PlayerCountCondition>::default(),
            &[Wait, Skip],
        );
        reg.add_condition("idle", || Box::<IdleCargoCondition>::default(), &[Wait]);
        reg.add_condition(
            "unloaded",
            || Box::<StationUnloadedCondition>::default(),
            &[Wait, Skip],
        );
        reg.add_condition(
            "powered",
            || Box::<StationPoweredCondition>::default(),
            &[Wait, Skip],
        );

        debug!(
            instructions = reg.instructions.len(),
            wait_conditions = reg.wait_conditions.len(),
            skip_conditions = reg.skip_conditions.len(),
            "built builtin schedule registry"
        );
        reg
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn register_instruction(
        &mut self,
        id: Identifier,
        factory: InstructionFactory,
    ) -> Result<()> {
        if self.instructions.iter().any(|e| e.id == id) {
            return Err(ScheduleError::DuplicateRegistration {
                catalog: Catalog::Instructions,
                id,
            });
        }
        let product = factory().as_any().type_id();
        self.instructions.push(RegistryEntry {
            id,
            factory,
            product,
        });
        Ok(())
    }

    /// Register one condition kind into the wait and/or skip catalog.
    /// All-or-nothing: a duplicate in either requested catalog registers
    /// into neither.
    pub fn register_condition(
        &mut self,
        id: Identifier,
        factory: ConditionFactory,
        roles: &[ConditionRole],
    ) -> Result<()> {
        for role in roles {
            if self.condition_list(*role).iter().any(|e| e.id == id) {
                return Err(ScheduleError::DuplicateRegistration {
                    catalog: role.catalog(),
                    id,
                });
            }
        }
        for (i, role) in roles.iter().enumerate() {
            if roles[..i].contains(role) {
                continue;
            }
            let product = factory().as_any().type_id();
            let entry = RegistryEntry {
                id: id.clone(),
                factory,
                product,
            };
            self.condition_list_mut(*role).push(entry);
        }
        Ok(())
    }

    fn add_instruction(&mut self, path: &str, factory: InstructionFactory) {
        let product = factory().as_any().type_id();
        self.instructions.push(RegistryEntry {
            id: Identifier::local(path),
            factory,
            product,
        });
    }

    fn add_condition(&mut self, path: &str, factory: ConditionFactory, roles: &[ConditionRole]) {
        for role in roles {
            let product = factory().as_any().type_id();
            let entry = RegistryEntry {
                id: Identifier::local(path),
                factory,
                product,
            };
            self.condition_list_mut(*role).push(entry);
        }
    }

    fn condition_list(&self, role: ConditionRole) -> &[RegistryEntry<ConditionFactory>] {
        match role {
            ConditionRole::Wait => &self.wait_conditions,
            ConditionRole::Skip => &self.skip_conditions,
        }
    }

    fn condition_list_mut(
        &mut self,
        role: ConditionRole,
    ) -> &mut Vec<RegistryEntry<ConditionFactory>> {
        match role {
            ConditionRole::Wait => &mut self.wait_conditions,
            ConditionRole::Skip => &mut self.skip_conditions,
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn instruction_factory(&self, id: &Identifier) -> Result<InstructionFactory> {
        self.instructions
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.factory)
            .ok_or_else(|| ScheduleError::UnknownIdentifier {
                catalog: Catalog::Instructions,
                id: id.clone(),
            })
    }

    pub fn condition_factory(
        &self,
        role: ConditionRole,
        id: &Identifier,
    ) -> Result<ConditionFactory> {
        self.condition_list(role)
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.factory)
            .ok_or_else(|| ScheduleError::UnknownIdentifier {
                catalog: role.catalog(),
                id: id.clone(),
            })
    }

    /// Identifiers of one catalog, in registration order.
    pub fn identifiers(&self, catalog: Catalog) -> Vec<&Identifier> {
        match catalog {
            Catalog::Instructions => self.instructions.iter().map(|e| &e.id).collect(),
            Catalog::WaitConditions => self.wait_conditions.iter().map(|e| &e.id).collect(),
            Catalog::SkipConditions => self.skip_conditions.iter().map(|e| &e.id).collect(),
        }
    }

    /// Deduplicated union of the wait and skip catalogs, wait catalog
    /// first, each identifier once, order deterministic.
    pub fn all_condition_identifiers(&self) -> Vec<&Identifier> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in self.wait_conditions.iter().chain(&self.skip_conditions) {
            if seen.insert(&entry.id) {
                out.push(&entry.id);
            }
        }
        out
    }

    /// Ordered translation keys for a catalog's selection list, e.g.
    /// `railsched.schedule.condition.delay`.
    pub fn choice_labels(&self, catalog: Catalog) -> Vec<String> {
        let section = match catalog {
            Catalog::Instructions => "instruction",
            Catalog::WaitConditions | Catalog::SkipConditions => "condition",
        };
        self.identifiers(catalog)
            .into_iter()
            .map(|id| id.lang_key(section))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Identifier recovery
    // -----------------------------------------------------------------------

    pub fn instruction_identifier(&self, product: TypeId) -> Option<&Identifier> {
        self.instructions
            .iter()
            .find(|e| e.product == product)
            .map(|e| &e.id)
    }

    pub fn condition_identifier(&self, product: TypeId) -> Option<&Identifier> {
        self.wait_conditions
            .iter()
            .chain(&self.skip_conditions)
            .find(|e| e.product == product)
            .map(|e| &e.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::UnknownCondition;

    #[test]
    fn duplicate_instruction_registration_fails() {
        let mut reg = ScheduleRegistry::new();
        reg.register_instruction(Identifier::local("destination"), || {
            Box::<DestinationInstruction>::default()
        })
        .unwrap();
        let err = reg
            .register_instruction(Identifier::local("destination"), || {
                Box::<RenameInstruction>::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::DuplicateRegistration {
                catalog: Catalog::Instructions,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_condition_registration_fails_per_catalog() {
        let mut reg = ScheduleRegistry::new();
        reg.register_condition(
            Identifier::local("delay"),
            || Box::<ScheduledDelay>::default(),
            &[ConditionRole::Wait],
        )
        .unwrap();

        // Same id in the other catalog is fine.
        reg.register_condition(
            Identifier::local("delay"),
            || Box::<ScheduledDelay>::default(),
            &[ConditionRole::Skip],
        )
        .unwrap();

        let err = reg
            .register_condition(
                Identifier::local("delay"),
                || Box::<ScheduledDelay>::default(),
                &[ConditionRole::Wait],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::DuplicateRegistration {
                catalog: Catalog::WaitConditions,
                ..
            }
        ));
    }

    #[test]
    fn dual_catalog_registration_is_all_or_nothing() {
        let mut reg = ScheduleRegistry::new();
        reg.register_condition(
            Identifier::local("powered"),
            || Box::<StationPoweredCondition>::default(),
            &[ConditionRole::Skip],
        )
        .unwrap();

        // Wait is free but Skip collides; nothing may be added.
        assert!(reg
            .register_condition(
                Identifier::local("powered"),
                || Box::<StationPoweredCondition>::default(),
                &[ConditionRole::Wait, ConditionRole::Skip],
            )
            .is_err());
        assert!(reg.identifiers(Catalog::WaitConditions).is_empty());
        assert_eq!(reg.identifiers(Catalog::SkipConditions).len(), 1);
    }

    #[test]
    fn listing_preserves_registration_order() {
        let mut reg = ScheduleRegistry::new();
        reg.register_condition(
            Identifier::local("powered"),
            || Box::<StationPoweredCondition>::default(),
            &[ConditionRole::Wait],
        )
        .unwrap();
        reg.register_condition(
            Identifier::local("delay"),
            || Box::<ScheduledDelay>::default(),
            &[ConditionRole::Wait],
        )
        .unwrap();
        reg.register_condition(
            Identifier::local("unloaded"),
            || Box::<StationUnloadedCondition>::default(),
            &[ConditionRole::Wait],
        )
        .unwrap();

        let ids: Vec<String> = reg
            .identifiers(Catalog::WaitConditions)
            .into_iter()
            .map(Identifier::to_string)
            .collect();
        assert_eq!(
            ids,
            vec![
                "railsched:powered",
                "railsched:delay",
                "railsched:unloaded"
            ]
        );
    }

    #[test]
    fn dual_catalog_condition_listed_in_both_and_once_in_union() {
        let reg = ScheduleRegistry::builtin();
        let powered = Identifier::local("powered");
        assert!(reg.identifiers(Catalog::WaitConditions).contains(&&powered));
        assert!(reg.identifiers(Catalog::SkipConditions).contains(&&powered));

        let union = reg.all_condition_identifiers();
        assert_eq!(union.iter().filter(|id| ***id == powered).count(), 1);
    }

    #[test]
    fn union_is_ordered_and_covers_both_catalogs() {
        let reg = ScheduleRegistry::builtin();
        let union: Vec<String> = reg
            .all_condition_identifiers()
            .into_iter()
            .map(Identifier::to_string)
            .collect();
        // Wait catalog order first; skip-only additions would follow.
        assert_eq!(
            union,
            vec![
                "railsched:delay",
                "railsched:time_of_day",
                "railsched:fluid_threshold",
                "railsched:item_threshold",
                "railsched:redstone_link",
                "railsched:player_count",
                "railsched:idle",
                "railsched:unloaded",
                "railsched:powered",
            ]
        );
    }

    #[test]
    fn lookup_unknown_identifier() {
        let reg = ScheduleRegistry::builtin();
        let missing = Identifier::new("addonmod", "launch");
        assert!(matches!(
            reg.instruction_factory(&missing),
            Err(ScheduleError::UnknownIdentifier {
                catalog: Catalog::Instructions,
                ..
            })
        ));
        assert!(matches!(
            reg.condition_factory(ConditionRole::Wait, &missing),
            Err(ScheduleError::UnknownIdentifier {
                catalog: Catalog::WaitConditions,
                ..
            })
        ));
    }

    #[test]
    fn skip_only_lookup_does_not_see_wait_only_conditions() {
        let reg = ScheduleRegistry::builtin();
        let delay = Identifier::local("delay");
        assert!(reg.condition_factory(ConditionRole::Wait, &delay).is_ok());
        assert!(reg.condition_factory(ConditionRole::Skip, &delay).is_err());
    }

    #[test]
    fn factories_produce_fresh_instances() {
        let reg = ScheduleRegistry::builtin();
        let factory = reg
            .condition_factory(ConditionRole::Wait, &Identifier::local("delay"))
            .unwrap();
        let a = factory();
        let b = factory();
        // Distinct allocations with default configuration.
        assert_eq!(a.save_data(), b.save_data());
    }

    #[test]
    fn builtin_instruction_order_matches_registration() {
        let reg = ScheduleRegistry::builtin();
        let ids: Vec<String> = reg
            .identifiers(Catalog::Instructions)
            .into_iter()
            .map(Identifier::to_string)
            .collect();
        assert_eq!(
            ids,
            vec![
                "railsched:destination",
                "railsched:rename",
                "railsched:throttle"
            ]
        );
    }

    #[test]
    fn delay_listed_at_insertion_position() {
        // "delay" is the first wait condition registered by the builtin
        // set and must stay first in the listing.
        let reg = ScheduleRegistry::builtin();
        let ids = reg.identifiers(Catalog::WaitConditions);
        assert_eq!(ids[0], &Identifier::local("delay"));
    }

    #[test]
    fn choice_labels_follow_listing_order() {
        let reg = ScheduleRegistry::builtin();
        let labels = reg.choice_labels(Catalog::Instructions);
        assert_eq!(
            labels,
            vec![
                "railsched.schedule.instruction.destination",
                "railsched.schedule.instruction.rename",
                "railsched.schedule.instruction.throttle",
            ]
        );
        let labels = reg.choice_labels(Catalog::WaitConditions);
        assert_eq!(labels[0], "railsched.schedule.condition.delay");
    }

    #[test]
    fn identifier_recovery_by_type() {
        let reg = ScheduleRegistry::builtin();
        let instruction = ThrottleInstruction::default();
        assert_eq!(
            reg.instruction_identifier(instruction.as_any().type_id()),
            Some(&Identifier::local("throttle"))
        );
        let condition = ScheduledDelay::default();
        assert_eq!(
            reg.condition_identifier(condition.as_any().type_id()),
            Some(&Identifier::local("delay"))
        );
        // Placeholders are never registered.
        let unknown = UnknownCondition {
            id: Identifier::local("ghost"),
            data: Default::default(),
        };
        assert_eq!(reg.condition_identifier(unknown.as_any().type_id()), None);
    }

    #[test]
    fn repeated_role_in_one_call_registers_once() {
        let mut reg = ScheduleRegistry::new();
        reg.register_condition(
            Identifier::local("delay"),
            || Box::<ScheduledDelay>::default(),
            &[ConditionRole::Wait, ConditionRole::Wait],
        )
        .unwrap();
        assert_eq!(reg.identifiers(Catalog::WaitConditions).len(), 1);
    }
}
