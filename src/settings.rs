//! TOML-backed configuration: a `Settings` struct deserialized with
//! `serde` + `toml`, validated with a post-deserialize `check_settings`
//! pass that surfaces violations as `ConfigError`.

use crate::errors::*;
use crate::forces::cell_cell::SpringVariant;
use crate::Float;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::prelude::*;

/// Grid and time-stepping configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSettings {
    pub nx: usize,
    pub ny: usize,
    pub dt: Float,
    #[serde(default = "default_re")]
    pub re: Float,
    #[serde(default = "default_neighbour_update_frequency")]
    pub node_neighbour_update_frequency: usize,
    #[serde(default = "default_fft_threads")]
    pub fft_threads: usize,
}

fn default_re() -> Float {
    1e-4
}

fn default_neighbour_update_frequency() -> usize {
    1
}

fn default_fft_threads() -> usize {
    2
}

/// Settings for the membrane elasticity force module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembraneSettings {
    pub spring_constant: Float,
    pub rest_length: Float,
}

/// Settings for the cell-cell interaction force module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellCellSettings {
    pub spring_constant: Float,
    #[serde(default)]
    pub morse: bool,
}

impl CellCellSettings {
    pub fn variant(&self) -> SpringVariant {
        if self.morse {
            SpringVariant::Morse
        } else {
            SpringVariant::Linear
        }
    }
}

/// Population-level scalars: `interaction_distance`,
/// `element_division_spacing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationSettings {
    pub interaction_distance: Float,
    pub intrinsic_spacing: Float,
    pub element_division_spacing: Option<Float>,
}

/// Top-level settings structure, grouped by subsystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub grid: GridSettings,
    pub membrane: MembraneSettings,
    pub cell_cell: CellCellSettings,
    pub population: PopulationSettings,
}

fn read_from_file(filename: &str) -> Result<String> {
    let mut f = File::open(filename).chain_err(|| "Unable to open parameter file.")?;
    let mut content = String::new();
    f.read_to_string(&mut content)
        .chain_err(|| "Unable to read parameter file.")?;
    Ok(content)
}

/// Reads and validates a TOML parameter file.
pub fn read_parameter_file(path: &str) -> Result<Settings> {
    let toml_string = read_from_file(path)?;
    let settings: Settings =
        toml::from_str(&toml_string).chain_err(|| "Unable to parse parameter file.")?;
    check_settings(&settings)?;
    Ok(settings)
}

/// Validates the enumerated configuration constraints: positive even
/// grid dims, positive `dt`/`Re`, positive update frequency and thread
/// count. `element_division_spacing`, if present, must be positive; its
/// absence is legal (division simply isn't available until it is set).
pub fn check_settings(settings: &Settings) -> Result<()> {
    let g = &settings.grid;

    if g.nx == 0 || g.ny == 0 || g.nx % 2 != 0 || g.ny % 2 != 0 {
        bail!(ErrorKind::ConfigError(format!(
            "Nx, Ny must be positive even integers, got ({}, {})",
            g.nx, g.ny
        )));
    }
    if g.dt <= 0.0 {
        bail!(ErrorKind::ConfigError(format!(
            "dt must be positive, got {}",
            g.dt
        )));
    }
    if g.re <= 0.0 {
        bail!(ErrorKind::ConfigError(format!(
            "Re must be positive, got {}",
            g.re
        )));
    }
    if g.node_neighbour_update_frequency == 0 {
        bail!(ErrorKind::ConfigError(
            "node_neighbour_update_frequency must be positive".to_string()
        ));
    }
    if g.fft_threads == 0 {
        bail!(ErrorKind::ConfigError(
            "fft_threads must be positive".to_string()
        ));
    }

    let p = &settings.population;
    if p.interaction_distance <= 0.0 {
        bail!(ErrorKind::ConfigError(format!(
            "interaction_distance must be positive, got {}",
            p.interaction_distance
        )));
    }
    if p.intrinsic_spacing <= 0.0 {
        bail!(ErrorKind::ConfigError(format!(
            "intrinsic_spacing must be positive, got {}",
            p.intrinsic_spacing
        )));
    }
    if let Some(spacing) = p.element_division_spacing {
        if spacing <= 0.0 {
            bail!(ErrorKind::ConfigError(format!(
                "element_division_spacing must be positive when set, got {}",
                spacing
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        Settings {
            grid: GridSettings {
                nx: 32,
                ny: 32,
                dt: 0.01,
                re: 1e-4,
                node_neighbour_update_frequency: 1,
                fft_threads: 2,
            },
            membrane: MembraneSettings {
                spring_constant: 1e8,
                rest_length: 0.01,
            },
            cell_cell: CellCellSettings {
                spring_constant: 1.0,
                morse: false,
            },
            population: PopulationSettings {
                interaction_distance: 0.1,
                intrinsic_spacing: 0.01,
                element_division_spacing: Some(0.02),
            },
        }
    }

    #[test]
    fn valid_settings_pass() {
        assert!(check_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn odd_grid_dims_rejected() {
        let mut s = valid_settings();
        s.grid.nx = 33;
        assert!(check_settings(&s).is_err());
    }

    #[test]
    fn nonpositive_dt_rejected() {
        let mut s = valid_settings();
        s.grid.dt = 0.0;
        assert!(check_settings(&s).is_err());
    }

    #[test]
    fn missing_division_spacing_is_legal() {
        let mut s = valid_settings();
        s.population.element_division_spacing = None;
        assert!(check_settings(&s).is_ok());
    }

    #[test]
    fn negative_division_spacing_rejected() {
        let mut s = valid_settings();
        s.population.element_division_spacing = Some(-0.1);
        assert!(check_settings(&s).is_err());
    }
}
