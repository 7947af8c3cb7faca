//! Built-in scenarios: a tap filling a container that empties through a drain.

use envision_core::{Direction, Entity, Landmark, QuantityRef, QuantitySpaces, Relationship, Result};
use tracing::debug;

use crate::scenario::Scenario;

/// Name of the minimal tap/container/drain scenario.
pub const TAP_CONTAINER_DRAIN: &str = "tap-container-drain";

/// Name of the extended scenario with height, pressure and tap actions.
pub const TUB_WITH_PRESSURE: &str = "tub-with-pressure";

fn q(entity: &str, quantity: &str) -> QuantityRef {
    QuantityRef::new(entity, quantity)
}

/// Tap (inflow), container (volume) and drain (outflow), with the tap
/// starting to open.
pub fn tap_container_drain() -> Result<Scenario> {
    use Landmark::{Plus, Zero};
    let spaces = QuantitySpaces::standard();

    Scenario::builder()
        .name(TAP_CONTAINER_DRAIN)
        .description("Tap opening into an empty container with a drain")
        .entity(Entity::new("tap", "tap").with_standard_quantity(&spaces, "inflow", Zero, Plus)?)
        .entity(
            Entity::new("container", "container")
                .with_standard_quantity(&spaces, "volume", Zero, Zero)?,
        )
        .entity(Entity::new("drain", "drain").with_standard_quantity(&spaces, "outflow", Zero, Zero)?)
        .rule(Relationship::influence(q("tap", "inflow"), q("container", "volume"), Direction::Positive))
        .rule(Relationship::influence(q("drain", "outflow"), q("container", "volume"), Direction::Negative))
        .rule(Relationship::proportion(q("container", "volume"), q("drain", "outflow"), Direction::Positive))
        .with_consequences()
        .rule(Relationship::correspondence_max(q("container", "volume"), q("drain", "outflow")))
        .rule(Relationship::correspondence_zero(q("container", "volume"), q("drain", "outflow")))
        .build()
}

/// The container also tracks height and pressure, pressure drives the
/// outflow, and the tap can be opened or closed at any time.
pub fn tub_with_pressure() -> Result<Scenario> {
    use Landmark::{Plus, Zero};
    let spaces = QuantitySpaces::standard();

    let container = Entity::new("container", "container")
        .with_standard_quantity(&spaces, "volume", Zero, Zero)?
        .with_standard_quantity(&spaces, "height", Zero, Zero)?
        .with_standard_quantity(&spaces, "pressure", Zero, Zero)?;

    let volume = q("container", "volume");
    let height = q("container", "height");
    let pressure = q("container", "pressure");
    let outflow = q("drain", "outflow");

    Scenario::builder()
        .name(TUB_WITH_PRESSURE)
        .description("Container with height and pressure chain, operator-controlled tap")
        .entity(Entity::new("tap", "tap").with_standard_quantity(&spaces, "inflow", Zero, Plus)?)
        .entity(container)
        .entity(Entity::new("drain", "drain").with_standard_quantity(&spaces, "outflow", Zero, Zero)?)
        .rule(Relationship::action(q("tap", "inflow"), Direction::Positive))
        .rule(Relationship::action(q("tap", "inflow"), Direction::Negative))
        .rule(Relationship::influence(q("tap", "inflow"), volume.clone(), Direction::Positive))
        .rule(Relationship::influence(outflow.clone(), volume.clone(), Direction::Negative))
        .rule(Relationship::proportion(volume.clone(), height.clone(), Direction::Positive))
        .rule(Relationship::proportion(height.clone(), pressure.clone(), Direction::Positive))
        .rule(Relationship::proportion(pressure.clone(), outflow.clone(), Direction::Positive))
        .with_consequences()
        .rule(Relationship::correspondence_max(height.clone(), pressure.clone()))
        .rule(Relationship::correspondence_zero(height.clone(), pressure.clone()))
        .rule(Relationship::correspondence_max(volume.clone(), height.clone()))
        .rule(Relationship::correspondence_zero(volume, height))
        .rule(Relationship::correspondence_max(pressure.clone(), outflow.clone()))
        .rule(Relationship::correspondence_zero(pressure, outflow))
        .build()
}

/// Every built-in scenario.
pub fn catalog() -> Result<Vec<Scenario>> {
    Ok(vec![tap_container_drain()?, tub_with_pressure()?])
}

/// Look up a built-in scenario by name.
pub fn find(name: &str) -> Result<Option<Scenario>> {
    debug!("Looking up built-in scenario '{}'", name);
    match name {
        TAP_CONTAINER_DRAIN => tap_container_drain().map(Some),
        TUB_WITH_PRESSURE => tub_with_pressure().map(Some),
        _ => Ok(None),
    }
}
