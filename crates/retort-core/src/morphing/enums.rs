//! Enum loaders and dumpers
//!
//! Three wire representations are supported: the member's exact value (the
//! default), the member's name (optionally restyled or renamed) and the
//! member's value passed through the loader of another type.

use crate::morphing::{sub_dumper, sub_loader, DumpError, Dumper, DumperRequest, LoadError, LoadErrorKind, Loader, LoaderRequest};
use crate::name_layout::{convert_snake_style, NameStyle};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{ClassRef, TypeExpr};
use crate::value::{EnumValue, Value};
use indexmap::IndexMap;

fn enum_class(mediator: &Mediator<'_>, ty: &TypeExpr) -> ProvideResult<ClassRef> {
    let norm = mediator.normalize(ty)?;
    match norm.class() {
        Some(class) if class.enum_def().is_some() => Ok(class.clone()),
        _ => Err(ProvideError::skip()),
    }
}

fn members(class: &ClassRef) -> Vec<EnumValue> {
    class
        .members()
        .into_iter()
        .filter_map(|value| match value {
            Value::Enum(member) => Some(member),
            _ => None,
        })
        .collect()
}

fn member_of<'v>(class: &ClassRef, value: &'v Value) -> Result<&'v EnumValue, DumpError> {
    match value {
        Value::Enum(member) if member.class == *class => Ok(member),
        other => Err(DumpError::type_error(class.name(), other.type_name())),
    }
}

/// Members are represented by their value as is
#[derive(Debug, Clone, Default)]
pub struct EnumExactValueProvider;

impl Provider for EnumExactValueProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let class = enum_class(mediator, request.last_type())?;
        let members = members(&class);
        let strict = request.strict_coercion;
        Ok(Loader::new(move |data| {
            let found = members.iter().find(|m| {
                if strict {
                    *m.value == *data
                } else {
                    m.value.loose_eq(data)
                }
            });
            match found {
                Some(member) => Ok(Value::Enum(member.clone())),
                None => Err(LoadError::new(LoadErrorKind::BadVariant {
                    allowed: members.iter().map(|m| m.value.as_ref().clone()).collect(),
                    input_value: data.clone(),
                })),
            }
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let class = enum_class(mediator, request.last_type())?;
        Ok(Dumper::new(move |value| Ok(member_of(&class, value)?.value.as_ref().clone())))
    }
}

/// Members are represented by their names
#[derive(Debug, Clone, Default)]
pub struct EnumNameProvider {
    name_style: Option<NameStyle>,
    map: IndexMap<String, String>,
}

impl EnumNameProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_style(mut self, style: NameStyle) -> Self {
        self.name_style = Some(style);
        self
    }

    /// Explicit wire name of a member, takes precedence over the name style
    pub fn rename(mut self, member: impl Into<String>, wire_name: impl Into<String>) -> Self {
        self.map.insert(member.into(), wire_name.into());
        self
    }

    fn wire_names(&self, class: &ClassRef) -> ProvideResult<Vec<(String, EnumValue)>> {
        members(class)
            .into_iter()
            .map(|member| {
                let name = match (self.map.get(&member.name), self.name_style) {
                    (Some(mapped), _) => mapped.clone(),
                    (None, Some(style)) => convert_snake_style(&member.name, style)?,
                    (None, None) => member.name.clone(),
                };
                Ok((name, member))
            })
            .collect()
    }
}

impl Provider for EnumNameProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let class = enum_class(mediator, request.last_type())?;
        let names = self.wire_names(&class)?;
        Ok(Loader::new(move |data| {
            let Value::Str(name) = data else {
                return Err(LoadError::type_error("str", data));
            };
            match names.iter().find(|(wire, _)| wire == name) {
                Some((_, member)) => Ok(Value::Enum(member.clone())),
                None => Err(LoadError::new(LoadErrorKind::BadVariant {
                    allowed: names.iter().map(|(wire, _)| Value::str(wire.clone())).collect(),
                    input_value: data.clone(),
                })),
            }
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let class = enum_class(mediator, request.last_type())?;
        let names = self.wire_names(&class)?;
        Ok(Dumper::new(move |value| {
            let member = member_of(&class, value)?;
            names
                .iter()
                .find(|(_, m)| m.name == member.name)
                .map(|(wire, _)| Value::str(wire.clone()))
                .ok_or_else(|| DumpError::type_error(class.name(), value.type_name()))
        }))
    }
}

/// Member values are loaded and dumped as `value_type`
#[derive(Debug, Clone)]
pub struct EnumValueProvider {
    value_type: TypeExpr,
}

impl EnumValueProvider {
    pub fn new(value_type: TypeExpr) -> Self {
        EnumValueProvider { value_type }
    }
}

impl Provider for EnumValueProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        let class = enum_class(mediator, request.last_type())?;
        let value_loader = sub_loader(mediator, request, self.value_type.clone())?;
        let members = members(&class);
        Ok(Loader::new(move |data| {
            let loaded = value_loader.call(data)?;
            match members.iter().find(|m| *m.value == loaded) {
                Some(member) => Ok(Value::Enum(member.clone())),
                None => Err(LoadError::new(LoadErrorKind::BadVariant {
                    allowed: members.iter().map(|m| m.value.as_ref().clone()).collect(),
                    input_value: data.clone(),
                })),
            }
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        let class = enum_class(mediator, request.last_type())?;
        let value_dumper = sub_dumper(mediator, request, self.value_type.clone())?;
        Ok(Dumper::new(move |value| value_dumper.call(&member_of(&class, value)?.value)))
    }
}
