//! Screen coordinates and labels of the game UI (1920x1080 client).
//!
//! Every value can be overridden from `settings.json` under `layout`; a
//! partially given section keeps the defaults for the fields it omits.

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{Point, ScreenRegion};

const fn pt(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

const fn rect(l: i32, t: i32, r: i32, b: i32) -> ScreenRegion {
    ScreenRegion::from_ltrb(l, t, r, b)
}

fn one() -> u32 {
    1
}

/// A label to look for and where.
#[derive(Debug, Clone, Deserialize)]
pub struct TextTarget {
    pub label: String,
    pub region: ScreenRegion,
    #[serde(default = "one")]
    pub clicks: u32,
}

impl TextTarget {
    fn new(label: &str, region: ScreenRegion) -> Self {
        Self { label: label.to_string(), region, clicks: 1 }
    }

    fn clicks(mut self, clicks: u32) -> Self {
        self.clicks = clicks;
        self
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClickStep {
    pub at: Point,
    #[serde(default = "one")]
    pub clicks: u32,
}

const fn step(x: i32, y: i32, clicks: u32) -> ClickStep {
    ClickStep { at: pt(x, y), clicks }
}

/// Minimap jump followed by an attack-move on the main view.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MapMove {
    pub minimap: Point,
    pub destination: Point,
}

/// One consumable in the item sweep: when its icon shows, click it, then the
/// first target label found, else the fallback (twice).
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRule {
    pub template: PathBuf,
    #[serde(default)]
    pub targets: Vec<TextTarget>,
    #[serde(default)]
    pub fallback: Option<Point>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StartLayout {
    pub opening_move: MapMove,
}

impl Default for StartLayout {
    fn default() -> Self {
        Self { opening_move: MapMove { minimap: pt(90, 943), destination: pt(939, 267) } }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectLayout {
    pub ended_label: TextTarget,
    pub refresh_click: Point,
    pub investment_toggle: Point,
    pub relocation_out: MapMove,
    pub relocation_back: MapMove,
    pub shop_button: Point,
    pub shop_clicks: u32,
}

impl Default for CollectLayout {
    fn default() -> Self {
        Self {
            ended_label: TextTarget::new("收起", rect(700, 706, 1145, 925)).clicks(2),
            refresh_click: pt(963, 525),
            investment_toggle: pt(806, 976),
            relocation_out: MapMove { minimap: pt(73, 911), destination: pt(707, 420) },
            relocation_back: MapMove { minimap: pt(88, 932), destination: pt(910, 595) },
            shop_button: pt(1880, 354),
            shop_clicks: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillLayout {
    pub trigger: Point,
    pub marker: TextTarget,
    pub candidates: ScreenRegion,
    pub priority: Vec<String>,
    pub default_pick: ClickStep,
    pub rebirth: Vec<ClickStep>,
}

impl Default for SkillLayout {
    fn default() -> Self {
        let priority = [
            "极速箭术", "月神箭", "生命膨胀", "血之箭", "琉璃大炮", "小金库", "百步穿杨",
            "献祭", "多重射击", "浸毒武器", "剧毒体质", "死亡之舞", "黄金剑", "自愈之力",
        ];
        Self {
            trigger: pt(878, 991),
            marker: TextTarget::new("刷新", rect(775, 758, 1095, 855)),
            candidates: rect(512, 442, 1398, 525),
            priority: priority.iter().map(|s| s.to_string()).collect(),
            default_pick: step(770, 551, 3),
            rebirth: vec![
                step(963, 525, 1),
                step(947, 982, 1),
                step(1034, 978, 1),
                step(770, 551, 3),
                step(1066, 634, 3),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ItemLayout {
    pub rounds: u32,
    pub icon_region: ScreenRegion,
    pub rules: Vec<ItemRule>,
}

impl Default for ItemLayout {
    fn default() -> Self {
        let fallback = Some(pt(898, 561));
        Self {
            rounds: 20,
            icon_region: rect(1142, 931, 1372, 1064),
            rules: vec![
                ItemRule {
                    template: "images/shengji.bmp".into(),
                    targets: vec![TextTarget::new("攻击速度", rect(803, 335, 1075, 591)).clicks(2)],
                    fallback,
                },
                ItemRule {
                    template: "images/jueze.bmp".into(),
                    targets: vec![
                        TextTarget::new("生命值", rect(713, 371, 789, 563)),
                        TextTarget::new("生命值", rect(907, 368, 976, 567)),
                    ],
                    fallback,
                },
                ItemRule {
                    template: "images/shenhua.bmp".into(),
                    targets: vec![
                        TextTarget::new("生命值", rect(835, 361, 986, 565)),
                        TextTarget::new("生命恢复", rect(835, 361, 986, 565)),
                    ],
                    fallback,
                },
                ItemRule { template: "images/quanneng.bmp".into(), targets: Vec::new(), fallback: None },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RestartLayout {
    pub menu: Point,
    pub confirm_label: TextTarget,
    pub confirm_button: Point,
}

impl Default for RestartLayout {
    fn default() -> Self {
        Self {
            menu: pt(112, 955),
            confirm_label: TextTarget::new("重开游戏", rect(809, 565, 905, 597)).clicks(2),
            confirm_button: pt(823, 624),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DifficultyLayout {
    pub begin_label: TextTarget,
    pub x: i32,
    pub base_y: i32,
    pub step: i32,
}

impl DifficultyLayout {
    /// Row of `level` (1-based) in the difficulty list.
    pub fn row(&self, level: u32) -> Point {
        pt(self.x, self.base_y + (level as i32 - 1) * self.step)
    }
}

impl Default for DifficultyLayout {
    fn default() -> Self {
        Self {
            begin_label: TextTarget::new("开始游戏", rect(1649, 939, 1819, 995)).clicks(2),
            x: 953,
            base_y: 291,
            step: 53,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveLayout {
    pub menu_clicks: Vec<Point>,
    pub rally_minimap: Option<Point>,
    pub rally_point: Point,
    pub confirm_label: TextTarget,
    pub attempts: u32,
    pub rewards: ScreenRegion,
    pub reward_filters: Vec<String>,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            menu_clicks: vec![pt(1076, 603), pt(832, 625)],
            rally_minimap: None,
            rally_point: pt(962, 521),
            confirm_label: TextTarget::new("确定", rect(871, 847, 1051, 895)).clicks(2),
            attempts: 50,
            rewards: rect(497, 195, 1367, 733),
            reward_filters: vec!["铜币".into(), "阶".into()],
        }
    }
}

/// All per-game coordinates and labels consumed by the phases.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameLayout {
    pub clock: ScreenRegion,
    pub clock_magnification: u32,
    pub start: StartLayout,
    pub collect: CollectLayout,
    pub skills: SkillLayout,
    pub items: ItemLayout,
    pub restart: RestartLayout,
    pub difficulty: DifficultyLayout,
    pub archive: ArchiveLayout,
}

impl Default for GameLayout {
    fn default() -> Self {
        Self {
            clock: rect(897, 0, 1015, 27),
            clock_magnification: 2,
            start: StartLayout::default(),
            collect: CollectLayout::default(),
            skills: SkillLayout::default(),
            items: ItemLayout::default(),
            restart: RestartLayout::default(),
            difficulty: DifficultyLayout::default(),
            archive: ArchiveLayout::default(),
        }
    }
}
