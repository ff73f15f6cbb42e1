//! Core types for schematic representation.

use std::fmt;

/// Index of an endpoint (one element terminal) in a [`Schematic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub usize);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Index of an element in a [`Schematic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point on the drawing plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Element types that can appear in a schematic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Zero-impedance connection, collapsed away during reduction
    Wire,
    /// P0 - P1 = R * Q
    Resistor,
    /// Q = C * d(P0 - P1)/dt
    Capacitor,
    /// P0 - P1 = L * dQ/dt
    Inductor,
    /// Ideal valve, conducts from terminal 0 to terminal 1
    Diode,
    /// Fixed zero potential at terminal 0
    Ground,
    /// Imposed potential at terminal 0
    PressureSource,
    /// Imposed flow from terminal 0 to terminal 1
    FlowSource,
}

impl ElementKind {
    /// Parse an element kind from a netlist keyword or one-letter alias.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "w" | "wire" => Some(Self::Wire),
            "r" | "resistor" => Some(Self::Resistor),
            "c" | "capacitor" => Some(Self::Capacitor),
            "l" | "inductor" => Some(Self::Inductor),
            "d" | "diode" => Some(Self::Diode),
            "g" | "gnd" | "ground" => Some(Self::Ground),
            "p" | "psource" | "pressure" => Some(Self::PressureSource),
            "q" | "qsource" | "flow" => Some(Self::FlowSource),
            _ => None,
        }
    }

    /// Short prefix used for generated element names.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Wire => "W",
            Self::Resistor => "R",
            Self::Capacitor => "C",
            Self::Inductor => "L",
            Self::Diode => "D",
            Self::Ground => "Gnd",
            Self::PressureSource => "PSc",
            Self::FlowSource => "QSc",
        }
    }

    pub fn is_wire(&self) -> bool {
        matches!(self, Self::Wire)
    }

    /// Elements whose terminal 1 is a phantom reference potential.
    pub fn has_reference_terminal(&self) -> bool {
        matches!(self, Self::Ground | Self::PressureSource)
    }

    /// Elements whose value may be a time expression.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::PressureSource | Self::FlowSource)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wire => "wire",
            Self::Resistor => "resistor",
            Self::Capacitor => "capacitor",
            Self::Inductor => "inductor",
            Self::Diode => "diode",
            Self::Ground => "ground",
            Self::PressureSource => "pressure source",
            Self::FlowSource => "flow source",
        };
        f.write_str(name)
    }
}

/// The value an element contributes: a constant or a time expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceValue<'a> {
    Constant(f64),
    Expression(&'a str),
}

/// One element terminal on the drawing plane.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub position: Point,
    /// Pressure listener name, if the user asked to record this potential
    pub listener: Option<String>,
}

/// A two-terminal element.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    pub kind: ElementKind,
    pub endpoints: [EndpointId; 2],
    /// Scalar value (resistance, capacitance, source level, ...)
    pub value: f64,
    /// Time expression, used instead of `value` when `active` is set
    pub expression: Option<String>,
    pub active: bool,
    /// Flow listener name, if the user asked to record the flow through it
    pub flow_listener: Option<String>,
}

impl Element {
    /// The value selected by the `active` flag.
    pub fn source_value(&self) -> SourceValue<'_> {
        match (&self.expression, self.active) {
            (Some(expr), true) => SourceValue::Expression(expr),
            _ => SourceValue::Constant(self.value),
        }
    }
}

/// Snapshot of a drawn network: endpoints and the elements owning them.
#[derive(Debug, Clone, Default)]
pub struct Schematic {
    pub endpoints: Vec<Endpoint>,
    pub elements: Vec<Element>,
}

impl Schematic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element between two points. Each terminal gets its own endpoint.
    ///
    /// An empty `name` is replaced by the kind prefix and a counter.
    pub fn add_element(
        &mut self,
        kind: ElementKind,
        name: &str,
        from: impl Into<Point>,
        to: impl Into<Point>,
        value: f64,
    ) -> ElementId {
        let id = ElementId(self.elements.len());
        let first = EndpointId(self.endpoints.len());
        for position in [from.into(), to.into()] {
            self.endpoints.push(Endpoint {
                position,
                listener: None,
            });
        }

        let name = if name.is_empty() {
            let count = self.elements.iter().filter(|e| e.kind == kind).count();
            format!("{}{}", kind.prefix(), count)
        } else {
            name.to_string()
        };

        self.elements.push(Element {
            id,
            name,
            kind,
            endpoints: [first, EndpointId(first.0 + 1)],
            value,
            expression: None,
            active: false,
            flow_listener: None,
        });
        id
    }

    /// Attach a time expression to an element and make it active.
    pub fn set_expression(&mut self, id: ElementId, expression: impl Into<String>) {
        let element = &mut self.elements[id.0];
        element.expression = Some(expression.into());
        element.active = true;
    }

    /// Select between the scalar value and the expression.
    pub fn set_active(&mut self, id: ElementId, active: bool) {
        self.elements[id.0].active = active;
    }

    /// Record the potential at `position` under `name`.
    ///
    /// Returns false if no endpoint lies at that position.
    pub fn listen_pressure(&mut self, position: impl Into<Point>, name: impl Into<String>) -> bool {
        let position = position.into();
        match self
            .endpoints
            .iter_mut()
            .find(|ep| coincident(ep.position, position))
        {
            Some(ep) => {
                ep.listener = Some(name.into());
                true
            }
            None => false,
        }
    }

    /// Record the flow through an element under `name`.
    pub fn listen_flow(&mut self, id: ElementId, name: impl Into<String>) {
        self.elements[id.0].flow_listener = Some(name.into());
    }

    /// Find an element by name.
    pub fn find_element(&self, name: &str) -> Option<ElementId> {
        self.elements.iter().find(|e| e.name == name).map(|e| e.id)
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn endpoint(&self, id: EndpointId) -> &Endpoint {
        &self.endpoints[id.0]
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Grid step below which two endpoints are the same connection point.
pub const COINCIDENCE_TOLERANCE: f64 = 1e-9;

/// Coordinates snapped to the coincidence grid.
///
/// Kept as floats so that large coordinates stay distinct; `-0.0` is
/// normalized so that both zeros share a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GridKey(f64, f64);

impl GridKey {
    /// Total order, x first.
    pub(crate) fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0).then(self.1.total_cmp(&other.1))
    }
}

fn snap(v: f64) -> f64 {
    (v / COINCIDENCE_TOLERANCE).round() + 0.0
}

pub(crate) fn grid_key(p: Point) -> GridKey {
    GridKey(snap(p.x), snap(p.y))
}

pub(crate) fn coincident(a: Point, b: Point) -> bool {
    grid_key(a) == grid_key(b)
}
