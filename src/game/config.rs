//! Plain text settings files.
//!
//! Each line holds a key followed by whitespace separated parameters. Quoted parameters may
//! contain whitespace and lines starting with `;` are comments:
//!
//! ```text
//! ; Terrain
//! height_map "Textures/Terrain/terrain.raw"
//! size 2049 2049
//! height_scale 50.0
//! layer "Textures/Terrain/grass.dds"
//! ```

use std::path::{Path, PathBuf};

use glam::UVec2;

use crate::engine::assets::{AssetError, Assets};

use super::camera::GroundFollow;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Line {line}: \"{key}\" is missing parameter {index}")]
    MissingValue {
        line: usize,
        key: String,
        index: usize,
    },

    #[error("Line {line}: \"{key}\" parameter {index} is invalid ({value})")]
    InvalidValue {
        line: usize,
        key: String,
        index: usize,
        value: String,
    },

    #[error("Could not read config file: {0}")]
    Asset(#[from] AssetError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigToken {
    String(String),
    Float(f32),
    Number(i64),
}

impl std::fmt::Display for ConfigToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigToken::String(s) => write!(f, "\"{s}\""),
            ConfigToken::Float(v) => write!(f, "{v}"),
            ConfigToken::Number(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLine {
    /// 1-based line number in the source text.
    pub line: usize,
    pub key: String,
    pub params: Vec<ConfigToken>,
}

impl ConfigLine {
    fn token(&self, index: usize) -> Result<&ConfigToken, ConfigError> {
        self.params.get(index).ok_or_else(|| ConfigError::MissingValue {
            line: self.line,
            key: self.key.clone(),
            index,
        })
    }

    fn invalid(&self, index: usize, token: &ConfigToken) -> ConfigError {
        ConfigError::InvalidValue {
            line: self.line,
            key: self.key.clone(),
            index,
            value: token.to_string(),
        }
    }

    pub fn float(&self, index: usize) -> Result<f32, ConfigError> {
        match self.token(index)? {
            ConfigToken::Float(value) => Ok(*value),
            ConfigToken::Number(value) => Ok(*value as f32),
            token => Err(self.invalid(index, token)),
        }
    }

    /// A finite float greater than zero.
    pub fn positive(&self, index: usize) -> Result<f32, ConfigError> {
        let value = self.float(index)?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(self.invalid(index, &ConfigToken::Float(value)))
        }
    }

    pub fn uint(&self, index: usize) -> Result<u32, ConfigError> {
        match self.token(index)? {
            ConfigToken::Number(value) => {
                u32::try_from(*value).map_err(|_| self.invalid(index, &ConfigToken::Number(*value)))
            }
            token => Err(self.invalid(index, token)),
        }
    }

    pub fn string(&self, index: usize) -> Result<String, ConfigError> {
        match self.token(index)? {
            ConfigToken::String(s) => Ok(s.clone()),
            token => Ok(token.to_string()),
        }
    }

    pub fn path(&self, index: usize) -> Result<PathBuf, ConfigError> {
        self.string(index).map(PathBuf::from)
    }
}

fn parse_string(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<String> {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }

    let mut result = String::new();

    match chars.peek()? {
        '"' => {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '"' {
                    break;
                }
                result.push(ch);
            }
        }
        _ => {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                result.push(ch);
                chars.next();
            }
        }
    }

    Some(result)
}

fn parse_token(s: String) -> ConfigToken {
    if let Ok(num) = s.parse::<i64>() {
        ConfigToken::Number(num)
    } else if let Ok(num) = s.parse::<f32>() {
        ConfigToken::Float(num)
    } else {
        ConfigToken::String(s)
    }
}

pub fn parse_line(line_number: usize, line: &str) -> Option<ConfigLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return None;
    }

    let mut chars = line.chars().peekable();

    let key = parse_string(&mut chars)?;

    let mut params = Vec::new();
    while let Some(param) = parse_string(&mut chars) {
        params.push(parse_token(param));
    }

    Some(ConfigLine {
        line: line_number,
        key,
        params,
    })
}

pub struct ConfigLines {
    lines: Vec<ConfigLine>,
}

impl ConfigLines {
    pub fn parse(s: &str) -> Self {
        Self {
            lines: s
                .lines()
                .enumerate()
                .filter_map(|(i, line)| parse_line(i + 1, line))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigLine> {
        self.lines.iter()
    }
}

/// Everything needed to build the terrain.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainInfo {
    /// Headerless 8-bit raw height samples, `size.x * size.y` bytes.
    pub height_map: PathBuf,
    pub blend_map: PathBuf,
    /// Texture layers in array order.
    pub layers: Vec<PathBuf>,
    pub height_scale: f32,
    pub cell_spacing: f32,
    /// Amount of height samples on each axis.
    pub size: UVec2,
    /// Each patch covers `2^cells_per_patch_exponent` cells per side.
    pub cells_per_patch_exponent: u32,
}

impl Default for TerrainInfo {
    fn default() -> Self {
        Self {
            height_map: PathBuf::from("Textures/Terrain/terrain.raw"),
            blend_map: PathBuf::from("Textures/Terrain/blend.dds"),
            layers: [
                "Textures/Terrain/grass.dds",
                "Textures/Terrain/darkdirt.dds",
                "Textures/Terrain/stone.dds",
                "Textures/Terrain/lightdirt.dds",
                "Textures/Terrain/snow.dds",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            height_scale: 50.0,
            cell_spacing: 0.5,
            size: UVec2::splat(2049),
            cells_per_patch_exponent: 6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraInfo {
    pub ground_follow: GroundFollow,
    pub walk_speed: f32,
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self {
            ground_follow: GroundFollow::default(),
            walk_speed: 8.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameConfig {
    pub terrain: TerrainInfo,
    pub camera: CameraInfo,
}

impl GameConfig {
    pub fn load(assets: &Assets, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = assets.load_string(path)?;
        Self::from_lines(&ConfigLines::parse(&text))
    }

    /// Start from the defaults and apply every line. Layers listed in the file replace the
    /// default layers.
    pub fn from_lines(lines: &ConfigLines) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut layers = Vec::new();

        for line in lines.iter() {
            let terrain = &mut config.terrain;
            let camera = &mut config.camera;

            match line.key.as_str() {
                "height_map" => terrain.height_map = line.path(0)?,
                "blend_map" => terrain.blend_map = line.path(0)?,
                "layer" => layers.push(line.path(0)?),
                "height_scale" => terrain.height_scale = line.positive(0)?,
                "cell_spacing" => terrain.cell_spacing = line.positive(0)?,
                "size" => terrain.size = UVec2::new(line.uint(0)?, line.uint(1)?),
                "cells_per_patch_exponent" => terrain.cells_per_patch_exponent = line.uint(0)?,
                "camera_height" => camera.ground_follow.height = line.float(0)?,
                "camera_smooth_factor" => camera.ground_follow.smooth_factor = line.float(0)?,
                "walk_speed" => camera.walk_speed = line.float(0)?,
                _ => tracing::warn!("Unknown config key on line {}: {}", line.line, line.key),
            }
        }

        if !layers.is_empty() {
            config.terrain.layers = layers;
        }

        Ok(config)
    }
}
