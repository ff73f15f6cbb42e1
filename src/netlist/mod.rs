//! Netlist reader.
//!
//! A line-oriented text description of a drawn network: each element is
//! placed by the coordinates of its two terminals, and terminals that land on
//! the same point are connected.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist   = { line }
//! line      = comment | directive | element | empty
//! comment   = ('#' | ';') { any_char }
//! element   = kind name x0 y0 x1 y1 [value | '"' expression '"']
//! directive = ".dt" number
//!           | ".maxtime" number
//!           | ".scheme" ("BDF" | "BDF2")
//!           | ".listen_p" x y [name]
//!           | ".listen_q" element_name [name]
//!
//! value       = number [unit_suffix]
//! unit_suffix = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! ```
//!
//! # Element Kinds
//!
//! | Kind | Alias | Value |
//! |------|-------|-------|
//! | `wire` | `W` | |
//! | `resistor` | `R` | resistance |
//! | `capacitor` | `C` | capacitance |
//! | `inductor` | `L` | inductance |
//! | `diode` | `D` | conducts from terminal 0 to terminal 1 |
//! | `ground` | `G` | terminal 0 held at zero |
//! | `psource` | `P` | pressure at terminal 0, constant or expression |
//! | `qsource` | `Q` | flow from terminal 0 to 1, constant or expression |
//!
//! # Example
//!
//! ```text
//! # RC charging
//! .dt 0.1
//! .maxtime 5
//!
//! psource P1  0 0  0 -1  "10*(t>0)"
//! resistor R1 0 0  1 0   25
//! capacitor C1 1 0 2 0   2
//! ground G1   2 0  2 1
//! .listen_p 1 0 vc
//! ```

mod lexer;
mod parser;

pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::circuit::Schematic;
use crate::error::Result;
use crate::solver::{Scheme, SolverConfig};

/// A parsed netlist: the schematic plus any solver settings it names.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    pub schematic: Schematic,
    pub dt: Option<f64>,
    pub maxtime: Option<f64>,
    pub scheme: Option<Scheme>,
}

impl Netlist {
    /// Apply the netlist's settings on top of `base`.
    pub fn config(&self, base: SolverConfig) -> SolverConfig {
        let mut config = base;
        if let Some(dt) = self.dt {
            config = config.with_dt(dt);
        }
        if let Some(maxtime) = self.maxtime {
            config = config.with_maxtime(maxtime);
        }
        if let Some(scheme) = self.scheme {
            config = config.with_scheme(scheme);
        }
        config
    }
}

/// Parse a netlist string.
pub fn parse(input: &str) -> Result<Netlist> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser::new(tokens).parse()
}

/// Parse a netlist file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<Netlist> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::LumpedError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_override_base_config() {
        let netlist = parse(".dt 0.5\n.scheme BDF2").unwrap();
        let config = netlist.config(SolverConfig::new().with_maxtime(3.0));
        assert_eq!(config.dt, 0.5);
        assert_eq!(config.maxtime, 3.0);
        assert_eq!(config.scheme, Scheme::Bdf2);
    }

    #[test]
    fn test_documented_example_parses() {
        let netlist = parse(
            "# RC charging\n\
             .dt 0.1\n\
             .maxtime 5\n\
             \n\
             psource P1  0 0  0 -1  \"10*(t>0)\"\n\
             resistor R1 0 0  1 0   25\n\
             capacitor C1 1 0 2 0   2\n\
             ground G1   2 0  2 1\n\
             .listen_p 1 0 vc\n",
        )
        .unwrap();
        assert_eq!(netlist.schematic.elements.len(), 4);
        assert_eq!(netlist.dt, Some(0.1));
    }
}
