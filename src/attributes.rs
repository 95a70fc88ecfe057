//! Post attributes: the categorical selections that drive one generation.
//!
//! Every selectable value comes from a fixed catalog and renders as the
//! Japanese label the model sees (never a raw code). Each value also has an
//! ASCII slug so it can be typed on a command line.
//!
//! Sets are `BTreeSet`s: composing the same selections twice always yields
//! the same order in the prompt, regardless of the order the user picked
//! them in.

use crate::error::SalonPostError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Declares a fixed-catalog enum with a display label and a CLI slug.
macro_rules! catalog_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => ($label:literal, $slug:literal), )+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every value of the catalog, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Human-readable label used in prompts and output.
            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// ASCII identifier accepted on the command line.
            pub fn slug(self) -> &'static str {
                match self {
                    $( $name::$variant => $slug, )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::SalonPostError;

            /// Accepts the label verbatim or the slug (ASCII case-insensitive).
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == s || v.slug().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        let known: Vec<&str> = $name::ALL.iter().map(|v| v.slug()).collect();
                        $crate::error::SalonPostError::InvalidAttributes(format!(
                            "unknown {} '{}' (expected one of: {})",
                            stringify!($name),
                            s,
                            known.join(", ")
                        ))
                    })
            }
        }
    };
}

pub(crate) use catalog_enum;

catalog_enum! {
    /// What the post is about.
    pub enum PostType {
        Treatment => ("施術紹介", "treatment"),
        Design => ("デザイン紹介", "design"),
        Availability => ("空き状況・予約案内", "availability"),
        Daily => ("日常・想い", "daily"),
    }
}

impl Default for PostType {
    fn default() -> Self {
        PostType::Treatment
    }
}

catalog_enum! {
    /// Target age band. An empty selection means "all ages".
    pub enum AgeBand {
        Teens => ("10代", "10s"),
        Twenties => ("20代", "20s"),
        Thirties => ("30代", "30s"),
        Forties => ("40代", "40s"),
        FiftiesPlus => ("50代以上", "50s"),
    }
}

catalog_enum! {
    /// Target gender.
    pub enum Gender {
        Female => ("女性", "female"),
        Male => ("男性", "male"),
        Unspecified => ("指定なし", "any"),
    }
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Unspecified
    }
}

catalog_enum! {
    /// Menu items offered by the salon.
    pub enum MenuItem {
        LashPerm => ("まつげパーマ", "lash-perm"),
        LashLift => ("パリジェンヌラッシュリフト", "lash-lift"),
        LashExtensions => ("まつげエクステ", "extensions"),
        BrowStyling => ("眉毛スタイリング", "brow-styling"),
        BrowWax => ("眉毛ワックス", "brow-wax"),
        LashSerumCare => ("まつげ美容液ケア", "serum-care"),
    }
}

catalog_enum! {
    /// Talking points the caption should lean on.
    pub enum EmphasisPoint {
        NaturalFinish => ("自然な仕上がり", "natural"),
        LongLasting => ("持ちの良さ", "long-lasting"),
        Gentle => ("まつげへのやさしさ", "gentle"),
        Counselling => ("丁寧なカウンセリング", "counselling"),
        CalmSpace => ("落ち着いた空間", "calm-space"),
        MorningTimeSaver => ("朝のメイク時短", "time-saver"),
    }
}

catalog_enum! {
    /// Destination for a caption.
    pub enum Platform {
        Instagram => ("Instagram", "instagram"),
        X => ("X", "x"),
    }
}

/// One request's selections. Immutable once built.
///
/// # Example
/// ```rust
/// use edgequake_salonpost::{AgeBand, Platform, PostAttributes, PostType};
///
/// let attrs = PostAttributes::builder()
///     .post_type(PostType::Treatment)
///     .age_band(AgeBand::Thirties)
///     .platforms([Platform::Instagram])
///     .build()
///     .unwrap();
/// assert_eq!(attrs.platforms(), vec![Platform::Instagram]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PostAttributesBuilder")]
pub struct PostAttributes {
    post_type: PostType,
    age_bands: BTreeSet<AgeBand>,
    gender: Gender,
    menu_items: BTreeSet<MenuItem>,
    emphasis: BTreeSet<EmphasisPoint>,
    platforms: BTreeSet<Platform>,
}

impl PostAttributes {
    pub fn builder() -> PostAttributesBuilder {
        PostAttributesBuilder::default()
    }

    pub fn post_type(&self) -> PostType {
        self.post_type
    }

    pub fn age_bands(&self) -> &BTreeSet<AgeBand> {
        &self.age_bands
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn menu_items(&self) -> &BTreeSet<MenuItem> {
        &self.menu_items
    }

    pub fn emphasis(&self) -> &BTreeSet<EmphasisPoint> {
        &self.emphasis
    }

    /// Requested platforms in catalog order. Never empty.
    pub fn platforms(&self) -> Vec<Platform> {
        self.platforms.iter().copied().collect()
    }

    pub fn wants(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }
}

/// Builder for [`PostAttributes`].
///
/// Platforms default to both Instagram and X; calling
/// [`platforms`](Self::platforms) replaces that default. Deserialised
/// attributes go through the same checks; absent fields take the builder
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostAttributesBuilder {
    post_type: PostType,
    age_bands: BTreeSet<AgeBand>,
    gender: Gender,
    menu_items: BTreeSet<MenuItem>,
    emphasis: BTreeSet<EmphasisPoint>,
    platforms: BTreeSet<Platform>,
}

impl Default for PostAttributesBuilder {
    fn default() -> Self {
        Self {
            post_type: PostType::default(),
            age_bands: BTreeSet::new(),
            gender: Gender::default(),
            menu_items: BTreeSet::new(),
            emphasis: BTreeSet::new(),
            platforms: Platform::ALL.iter().copied().collect(),
        }
    }
}

impl PostAttributesBuilder {
    pub fn post_type(mut self, post_type: PostType) -> Self {
        self.post_type = post_type;
        self
    }

    pub fn age_band(mut self, band: AgeBand) -> Self {
        self.age_bands.insert(band);
        self
    }

    pub fn age_bands(mut self, bands: impl IntoIterator<Item = AgeBand>) -> Self {
        self.age_bands.extend(bands);
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn menu_item(mut self, item: MenuItem) -> Self {
        self.menu_items.insert(item);
        self
    }

    pub fn menu_items(mut self, items: impl IntoIterator<Item = MenuItem>) -> Self {
        self.menu_items.extend(items);
        self
    }

    pub fn emphasis(mut self, points: impl IntoIterator<Item = EmphasisPoint>) -> Self {
        self.emphasis.extend(points);
        self
    }

    pub fn platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }

    /// Build the attributes, rejecting an empty platform selection.
    pub fn build(self) -> Result<PostAttributes, SalonPostError> {
        if self.platforms.is_empty() {
            return Err(SalonPostError::InvalidAttributes(
                "select at least one platform".into(),
            ));
        }
        Ok(PostAttributes {
            post_type: self.post_type,
            age_bands: self.age_bands,
            gender: self.gender,
            menu_items: self.menu_items,
            emphasis: self.emphasis,
            platforms: self.platforms,
        })
    }
}

impl TryFrom<PostAttributesBuilder> for PostAttributes {
    type Error = SalonPostError;

    fn try_from(builder: PostAttributesBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}
