//! Purpose: A pelican crossing controller written as a stream processor.
//! Exports: `Event`, `Lights`, `Vehicles`, `Pedestrians`, `PelicanConfig`, `pelican`.
//! Role: Demonstration machine driven by the `rspl pelican` command.
//! Invariants: Lights are output exactly once per phase entry, starting with vehicles green.
//! Invariants: Button pushes only matter while vehicles have green.
use serde::Serialize;

use crate::processor::StreamProcessor;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// A pedestrian pushed the crossing button.
    Push,
    /// One unit of time passed.
    Tick,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vehicles {
    Green,
    Amber,
    Red,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pedestrians {
    Red,
    Green,
    Flashing,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Lights {
    pub vehicles: Vehicles,
    pub pedestrians: Pedestrians,
}

/// Phase lengths in ticks. Zero is treated as one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PelicanConfig {
    pub amber_ticks: u32,
    pub walk_ticks: u32,
    pub flashing_ticks: u32,
}

impl Default for PelicanConfig {
    fn default() -> Self {
        Self {
            amber_ticks: 1,
            walk_ticks: 2,
            flashing_ticks: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    VehiclesGo,
    VehiclesStopping,
    PedestriansGo,
    PedestriansStopping,
}

impl Phase {
    fn lights(self) -> Lights {
        let (vehicles, pedestrians) = match self {
            Phase::VehiclesGo => (Vehicles::Green, Pedestrians::Red),
            Phase::VehiclesStopping => (Vehicles::Amber, Pedestrians::Red),
            Phase::PedestriansGo => (Vehicles::Red, Pedestrians::Green),
            Phase::PedestriansStopping => (Vehicles::Red, Pedestrians::Flashing),
        };
        Lights {
            vehicles,
            pedestrians,
        }
    }

    fn next(self) -> Phase {
        match self {
            Phase::VehiclesGo => Phase::VehiclesStopping,
            Phase::VehiclesStopping => Phase::PedestriansGo,
            Phase::PedestriansGo => Phase::PedestriansStopping,
            Phase::PedestriansStopping => Phase::VehiclesGo,
        }
    }

    fn ticks(self, config: PelicanConfig) -> u32 {
        let ticks = match self {
            Phase::VehiclesGo => 1,
            Phase::VehiclesStopping => config.amber_ticks,
            Phase::PedestriansGo => config.walk_ticks,
            Phase::PedestriansStopping => config.flashing_ticks,
        };
        ticks.max(1)
    }
}

/// The controller, starting with vehicles on green.
///
/// # Examples
///
/// ```
/// use rspl::pelican::{Event, PelicanConfig, Vehicles, pelican};
/// use rspl::{InfiniteList, Stream};
///
/// let events = InfiniteList::prepend(vec![Event::Push], InfiniteList::constant(Event::Tick));
/// let lights = pelican(PelicanConfig::default()).eval(events).unwrap();
/// let vehicles: Vec<_> = lights.take(3).unwrap().iter().map(|l| l.vehicles).collect();
/// assert_eq!(vehicles, vec![Vehicles::Green, Vehicles::Amber, Vehicles::Red]);
/// ```
pub fn pelican<'a>(config: PelicanConfig) -> StreamProcessor<'a, Event, Lights> {
    enter(Phase::VehiclesGo, config)
}

fn enter<'a>(phase: Phase, config: PelicanConfig) -> StreamProcessor<'a, Event, Lights> {
    tracing::trace!(?phase, "entering phase");
    StreamProcessor::put(phase.lights(), move || match phase {
        Phase::VehiclesGo => vehicles_go(config),
        _ => wait(phase, phase.ticks(config), config),
    })
}

fn vehicles_go<'a>(config: PelicanConfig) -> StreamProcessor<'a, Event, Lights> {
    StreamProcessor::get(move |event| match event {
        Event::Push => enter(Phase::VehiclesGo.next(), config),
        Event::Tick => vehicles_go(config),
    })
}

fn wait<'a>(
    phase: Phase,
    remaining: u32,
    config: PelicanConfig,
) -> StreamProcessor<'a, Event, Lights> {
    StreamProcessor::get(move |event| match event {
        Event::Tick if remaining <= 1 => enter(phase.next(), config),
        Event::Tick => wait(phase, remaining - 1, config),
        Event::Push => wait(phase, remaining, config),
    })
}
