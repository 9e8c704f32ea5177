//! 实体类型 / 变更动作 - 受控枚举
//!
//! entity_kind 为受控枚举，新增需客户端与服务端同步升级。

use std::str::FromStr;

use crate::ProtocolError;

/// 可同步的实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Inventory,
    Product,
    Location,
    Grocery,
    Household,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Product => "product",
            Self::Location => "location",
            Self::Grocery => "grocery",
            Self::Household => "household",
        }
    }

}

impl FromStr for EntityKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inventory" => Ok(Self::Inventory),
            "product" => Ok(Self::Product),
            "location" => Ok(Self::Location),
            "grocery" => Ok(Self::Grocery),
            "household" => Ok(Self::Household),
            other => Err(ProtocolError::UnknownEntityKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 变更动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for ChangeAction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
