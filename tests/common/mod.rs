#![allow(dead_code)]

use std::rc::Rc;

use anyhow::Result;
use indexmap::IndexMap;
use sheetbind::{
    CellParse, ContainerSchema, FieldOptions, RecordSchema, Sheet, SheetBinding, SlotShape, Vec2,
    Workbook, parse_enum,
};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a sheet from string-literal rows.
pub fn sheet(name: &str, rows: &[&[&str]]) -> Sheet {
    Sheet::new(
        name,
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

pub fn book(name: &str, sheets: Vec<Sheet>) -> Workbook {
    Workbook::with_sheets(name, sheets)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackType {
    #[default]
    Melee,
    Ranged,
}

impl CellParse for AttackType {
    fn intrinsic_default() -> Self {
        Self::default()
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        parse_enum(
            raw,
            &[("melee", AttackType::Melee), ("ranged", AttackType::Ranged)],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitData {
    pub id: String,
    pub name: String,
    pub hp: Vec<i32>,
    pub attack_type: AttackType,
    pub position: Vec2,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemData {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub price: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PcData {
    pub id: String,
    pub name: String,
    pub attack: Box<[f32]>,
    pub class: String,
    pub exp: i32,
}

pub fn unit_schema() -> Rc<RecordSchema<UnitData>> {
    Rc::new(
        RecordSchema::new("UnitData")
            .field("id", FieldOptions::new(), |u: &mut UnitData, v| u.id = v)
            .field("name", FieldOptions::new(), |u: &mut UnitData, v| {
                u.name = v
            })
            .field("hp", FieldOptions::new(), |u: &mut UnitData, v| u.hp = v)
            .field(
                "attackType",
                FieldOptions::new(),
                |u: &mut UnitData, v| u.attack_type = v,
            )
            .field("position", FieldOptions::new(), |u: &mut UnitData, v| {
                u.position = v
            }),
    )
}

pub fn item_schema() -> Rc<RecordSchema<ItemData>> {
    Rc::new(
        RecordSchema::new("ItemData")
            .field("id", FieldOptions::new(), |i: &mut ItemData, v| i.id = v)
            .field("name", FieldOptions::new(), |i: &mut ItemData, v| {
                i.name = v
            })
            .field("tags", FieldOptions::new(), |i: &mut ItemData, v| {
                i.tags = v
            })
            .field("price", FieldOptions::new(), |i: &mut ItemData, v| {
                i.price = v
            }),
    )
}

/// Key operation composing two fields, the `"Pc_{id}"` pattern.
pub fn pc_schema() -> Rc<RecordSchema<PcData>> {
    Rc::new(
        RecordSchema::new("PcData")
            .field("id", FieldOptions::new(), |p: &mut PcData, v| p.id = v)
            .field("name", FieldOptions::new(), |p: &mut PcData, v| p.name = v)
            .field("attack", FieldOptions::new(), |p: &mut PcData, v| {
                p.attack = v
            })
            .field(
                "class",
                FieldOptions::new().column("pcClass"),
                |p: &mut PcData, v| p.class = v,
            )
            .field("exp", FieldOptions::new(), |p: &mut PcData, v| p.exp = v)
            .key(|p| format!("Pc_{}", p.id)),
    )
}

/// Destination container mirroring a game-data aggregate: one sheet may
/// feed several slots, and slots stay `None` until first written.
#[derive(Default)]
pub struct GameData {
    pub units: Option<IndexMap<String, UnitData>>,
    pub items: Option<IndexMap<String, ItemData>>,
    pub pc_list: Option<Vec<PcData>>,
    pub pc_by_key: Option<IndexMap<String, PcData>>,
}

pub fn game_schema(
    unit_binding: SheetBinding,
    item_binding: SheetBinding,
) -> ContainerSchema<GameData> {
    ContainerSchema::new()
        .slot(
            "UnitData",
            unit_binding,
            unit_schema(),
            SlotShape::Map(Rc::new(|g: &mut GameData| &mut g.units)),
        )
        .slot(
            "ItemData",
            item_binding,
            item_schema(),
            SlotShape::Map(Rc::new(|g: &mut GameData| &mut g.items)),
        )
        .slot(
            "PcList",
            SheetBinding::new().sheet("PcData").optional(),
            pc_schema(),
            SlotShape::List(Rc::new(|g: &mut GameData| &mut g.pc_list)),
        )
        .slot(
            "PcByKey",
            SheetBinding::new().sheet("PcData").optional(),
            pc_schema(),
            SlotShape::Map(Rc::new(|g: &mut GameData| &mut g.pc_by_key)),
        )
}
