//! Model serialization boundary
//!
//! Models hold interned handles, so they cross the process boundary through
//! these DTOs: every handle is resolved to its string form on the way out
//! and re-interned on the way in. Round-tripping through a DTO reproduces
//! an equal model.
//!
//! Port syntax: `Return`, `Argument(2)`, with field selectors appended as
//! `.field`, e.g. `Argument(0).payload.data`. Field names must not contain
//! a dot.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::features::taint_analysis::domain::{
    AccessPath, Frame, Interners, Issue, Kind, KindId, Model, Modes, Path, Root, Taint,
};

/// Serialized kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindDto {
    Named { name: String },
    Propagation { input: String },
    Transform { base: Box<KindDto>, transform: String },
    LocalArgument { position: u32 },
    LocalReturn,
}

/// Serialized frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDto {
    pub kind: KindDto,
    pub distance: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub origins: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<KindDto>,
}

/// Taint attached to one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTaintDto {
    pub port: String,
    pub taint: Vec<FrameDto>,
}

/// Serialized propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationDto {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// Serialized issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDto {
    pub source_kind: KindDto,
    pub sink_kind: KindDto,
    pub callee: String,
    pub call_index: u32,
    pub sink_port: String,
    pub distance: u32,
    pub source_taint: Vec<FrameDto>,
    pub sink_taint: Vec<FrameDto>,
}

/// Serialized model: generations, parameter sources, sinks, propagations
/// and issues as arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDto {
    pub method: String,
    #[serde(default)]
    pub modes: Modes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generations: Vec<PortTaintDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_sources: Vec<PortTaintDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sinks: Vec<PortTaintDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub propagations: Vec<PropagationDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IssueDto>,
}

/// Render an access path as a port string.
pub fn port_to_string(port: &AccessPath, interners: &Interners) -> String {
    let mut result = root_to_string(port.root());
    for &field in port.path().iter() {
        result.push('.');
        result.push_str(&interners.field_name(field));
    }
    result
}

/// Parse a port string back into an access path.
pub fn parse_port(port: &str, interners: &Interners) -> Result<AccessPath> {
    let mut parts = port.split('.');
    let root = parts
        .next()
        .ok_or_else(|| EngineError::serialization("empty port"))?;
    let root = parse_root(root)?;
    let mut path = Path::new();
    for part in parts {
        if part.is_empty() {
            return Err(EngineError::serialization(format!(
                "empty selector in port `{}`",
                port
            )));
        }
        path.append(interners.field(part));
    }
    Ok(AccessPath::new(root, path))
}

fn root_to_string(root: Root) -> String {
    match root {
        Root::Return => "Return".to_string(),
        Root::Argument(position) => format!("Argument({})", position),
    }
}

fn parse_root(root: &str) -> Result<Root> {
    if root == "Return" {
        return Ok(Root::Return);
    }
    if let Some(inner) = root
        .strip_prefix("Argument(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let position = inner.parse::<u32>().map_err(|_| {
            EngineError::serialization(format!("invalid argument position `{}`", inner))
        })?;
        return Ok(Root::Argument(position));
    }
    Err(EngineError::serialization(format!(
        "invalid port root `{}`",
        root
    )))
}

fn kind_to_dto(kind: KindId, interners: &Interners) -> KindDto {
    match interners.resolve_kind(kind) {
        Kind::Named(name) => KindDto::Named { name },
        Kind::Propagation(input) => KindDto::Propagation {
            input: root_to_string(input),
        },
        Kind::Transform { base, transform } => KindDto::Transform {
            base: Box::new(kind_to_dto(base, interners)),
            transform,
        },
        Kind::LocalArgument(position) => KindDto::LocalArgument { position },
        Kind::LocalReturn => KindDto::LocalReturn,
    }
}

fn kind_from_dto(dto: &KindDto, interners: &Interners) -> Result<KindId> {
    let kind = match dto {
        KindDto::Named { name } => Kind::Named(name.clone()),
        KindDto::Propagation { input } => Kind::Propagation(parse_root(input)?),
        KindDto::Transform { base, transform } => Kind::Transform {
            base: kind_from_dto(base, interners)?,
            transform: transform.clone(),
        },
        KindDto::LocalArgument { position } => Kind::LocalArgument(*position),
        KindDto::LocalReturn => Kind::LocalReturn,
    };
    Ok(interners.kind(kind))
}

fn frame_to_dto(frame: &Frame, interners: &Interners) -> FrameDto {
    let mut features: Vec<String> = frame
        .features()
        .iter()
        .map(|&feature| interners.feature_name(feature))
        .collect();
    features.sort();
    let mut origins: Vec<String> = frame
        .origins()
        .iter()
        .map(|&origin| interners.method_name(origin))
        .collect();
    origins.sort();

    FrameDto {
        kind: kind_to_dto(frame.kind(), interners),
        distance: frame.distance(),
        features,
        origins,
        transforms: frame
            .transforms()
            .iter()
            .map(|&transform| kind_to_dto(transform, interners))
            .collect(),
    }
}

fn frame_from_dto(dto: &FrameDto, interners: &Interners) -> Result<Frame> {
    let kind = kind_from_dto(&dto.kind, interners)?;
    let mut frame = Frame::with_distance(kind, dto.distance);
    frame.add_features(dto.features.iter().map(|name| interners.feature(name.clone())));
    for origin in &dto.origins {
        frame.add_origin(interners.method(origin.clone()));
    }
    for transform in &dto.transforms {
        frame.push_transform(kind_from_dto(transform, interners)?);
    }
    Ok(frame)
}

fn taint_to_dto(taint: &Taint, interners: &Interners) -> Vec<FrameDto> {
    taint
        .frames()
        .map(|frame| frame_to_dto(frame, interners))
        .collect()
}

fn taint_from_dto(frames: &[FrameDto], interners: &Interners) -> Result<Taint> {
    frames
        .iter()
        .map(|dto| frame_from_dto(dto, interners))
        .collect::<Result<Vec<_>>>()
        .map(Taint::from_iter)
}

impl ModelDto {
    /// Resolve every handle in a model to its serialized form.
    pub fn from_model(model: &Model, interners: &Interners) -> Self {
        let port_taints = |elements: Vec<(AccessPath, Taint)>| -> Vec<PortTaintDto> {
            elements
                .into_iter()
                .map(|(port, taint)| PortTaintDto {
                    port: port_to_string(&port, interners),
                    taint: taint_to_dto(&taint, interners),
                })
                .collect()
        };

        Self {
            method: interners.method_name(model.method()),
            modes: model.modes(),
            generations: port_taints(model.generations().elements()),
            parameter_sources: port_taints(model.parameter_sources().elements()),
            sinks: port_taints(model.sinks().elements()),
            propagations: model
                .propagations()
                .iter()
                .map(|(input, output, features)| {
                    let mut feature_names: Vec<String> = features
                        .iter()
                        .map(|&feature| interners.feature_name(feature))
                        .collect();
                    feature_names.sort();
                    PropagationDto {
                        input: port_to_string(input, interners),
                        output: port_to_string(output, interners),
                        features: feature_names,
                    }
                })
                .collect(),
            issues: model
                .issues()
                .iter()
                .map(|issue| IssueDto {
                    source_kind: kind_to_dto(issue.source_kind(), interners),
                    sink_kind: kind_to_dto(issue.sink_kind(), interners),
                    callee: interners.method_name(issue.callee()),
                    call_index: issue.call_index(),
                    sink_port: port_to_string(issue.sink_port(), interners),
                    distance: issue.distance(),
                    source_taint: taint_to_dto(issue.source_taint(), interners),
                    sink_taint: taint_to_dto(issue.sink_taint(), interners),
                })
                .collect(),
        }
    }

    /// Re-intern a serialized model.
    pub fn to_model(&self, interners: &Interners) -> Result<Model> {
        let method = interners.method(self.method.clone());
        let mut model = Model::empty(method);
        model.set_modes(self.modes);

        for entry in &self.generations {
            let port = parse_port(&entry.port, interners)?;
            model.add_generations(&port, taint_from_dto(&entry.taint, interners)?);
        }
        for entry in &self.parameter_sources {
            let port = parse_port(&entry.port, interners)?;
            model.add_parameter_sources(&port, taint_from_dto(&entry.taint, interners)?);
        }
        for entry in &self.sinks {
            let port = parse_port(&entry.port, interners)?;
            model.add_sinks(&port, taint_from_dto(&entry.taint, interners)?);
        }
        for propagation in &self.propagations {
            model.add_propagation(
                parse_port(&propagation.input, interners)?,
                parse_port(&propagation.output, interners)?,
                propagation
                    .features
                    .iter()
                    .map(|name| interners.feature(name.clone()))
                    .collect::<Vec<_>>(),
            );
        }
        for issue in &self.issues {
            model.add_issue(Issue::new(
                kind_from_dto(&issue.source_kind, interners)?,
                kind_from_dto(&issue.sink_kind, interners)?,
                interners.method(issue.callee.clone()),
                issue.call_index,
                parse_port(&issue.sink_port, interners)?,
                issue.distance,
                taint_from_dto(&issue.source_taint, interners)?,
                taint_from_dto(&issue.sink_taint, interners)?,
            ));
        }

        Ok(model)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_string_roundtrip() {
        let interners = Interners::new();
        let mut port = AccessPath::argument(1);
        port.append(interners.field("payload"));
        port.append(interners.field("data"));

        let rendered = port_to_string(&port, &interners);
        assert_eq!(rendered, "Argument(1).payload.data");
        assert_eq!(parse_port(&rendered, &interners).unwrap(), port);

        assert_eq!(
            parse_port("Return", &interners).unwrap(),
            AccessPath::return_value()
        );
        assert!(parse_port("Local(3)", &interners).is_err());
        assert!(parse_port("Argument(x)", &interners).is_err());
    }

    #[test]
    fn test_kind_dto_roundtrip() {
        let interners = Interners::new();
        let base = interners.named_kind("UserInput");
        let transformed = interners.kind(Kind::Transform {
            base,
            transform: "encode".to_string(),
        });

        let dto = kind_to_dto(transformed, &interners);
        assert_eq!(kind_from_dto(&dto, &interners).unwrap(), transformed);
    }
}
