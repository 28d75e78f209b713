//! Field strategy registry
//!
//! Exactly one [`FieldStrategy`] per [`Field`]. Built once per batch from the
//! defaults below plus the resolved scope configuration, then shared
//! read-only. Registering a field twice replaces the earlier strategy; scope
//! overrides rely on this.

use crate::error::{EngineError, EngineResult, StrategyError};
use crate::fields::{Field, TERRITORY_FIELDS};
use crate::pipeline::MappingContext;
use crate::strategies::{self, ComputedFn};
use crate::types::MetadataRecord;
use folio_common::ResolvedConfig;
use tracing::{debug, warn};

/// Prefix under which generated content lands in a record
pub const EXTERNAL_PREFIX: &str = "llm";

/// How one output field gets its value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldStrategy {
    /// Fixed value
    Constant(String),
    /// First present source key, else `default`
    Passthrough { sources: Vec<String>, default: String },
    /// Named computed function over the listed input keys
    Computed { function: ComputedFn, inputs: Vec<String> },
    /// Generated content when present and non-blank, else the fallback
    ExternalWithFallback {
        external_field: String,
        fallback: Box<FieldStrategy>,
    },
}

impl FieldStrategy {
    pub fn constant(value: impl Into<String>) -> Self {
        FieldStrategy::Constant(value.into())
    }

    pub fn passthrough(sources: &[&str], default: &str) -> Self {
        FieldStrategy::Passthrough {
            sources: to_strings(sources),
            default: default.to_string(),
        }
    }

    pub fn computed(function: ComputedFn, inputs: &[&str]) -> Self {
        FieldStrategy::Computed {
            function,
            inputs: to_strings(inputs),
        }
    }

    /// `llm.<name>` with `fallback`
    pub fn external(name: &str, fallback: FieldStrategy) -> Self {
        FieldStrategy::ExternalWithFallback {
            external_field: format!("{}.{}", EXTERNAL_PREFIX, name),
            fallback: Box::new(fallback),
        }
    }

    pub fn evaluate(&self, record: &MetadataRecord, ctx: &MappingContext) -> Result<String, StrategyError> {
        match self {
            FieldStrategy::Constant(value) => Ok(value.clone()),
            FieldStrategy::Passthrough { sources, default } => Ok(sources
                .iter()
                .find_map(|k| record.get_str(k))
                .unwrap_or_else(|| default.clone())),
            FieldStrategy::Computed { function, inputs } => {
                strategies::evaluate(function, inputs, record, ctx)
            }
            FieldStrategy::ExternalWithFallback {
                external_field,
                fallback,
            } => match record.get_str(external_field) {
                Some(generated) => Ok(generated),
                None => fallback.evaluate(record, ctx),
            },
        }
    }

    /// Short label for logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            FieldStrategy::Constant(_) => "constant",
            FieldStrategy::Passthrough { .. } => "passthrough",
            FieldStrategy::Computed { .. } => "computed",
            FieldStrategy::ExternalWithFallback { .. } => "external",
        }
    }
}

fn to_strings(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Scope settings that pin a field to a constant
const SETTING_FIELDS: &[(&str, Field)] = &[
    ("lsi_account", Field::LsiAccount),
    ("metadata_contact", Field::MetadataContact),
    ("publisher", Field::Publisher),
    ("imprint", Field::Imprint),
];

/// Field → strategy table
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: Vec<FieldStrategy>,
}

impl StrategyRegistry {
    /// Every field mapped to `Constant("")`
    pub fn empty() -> Self {
        Self {
            strategies: vec![FieldStrategy::Constant(String::new()); Field::COUNT],
        }
    }

    /// Register `strategy` for `field`, returning the one it replaced
    pub fn register(&mut self, field: Field, strategy: FieldStrategy) -> FieldStrategy {
        let previous = std::mem::replace(&mut self.strategies[field.index()], strategy);
        debug!(
            field = %field,
            replaced = previous.kind(),
            now = self.strategies[field.index()].kind(),
            "Strategy registered"
        );
        previous
    }

    /// Register by column header text
    pub fn register_by_header(&mut self, header: &str, strategy: FieldStrategy) -> EngineResult<FieldStrategy> {
        let field = Field::from_header(header)
            .ok_or_else(|| EngineError::InvalidInput(format!("Unknown target field: {}", header)))?;
        Ok(self.register(field, strategy))
    }

    pub fn get(&self, field: Field) -> &FieldStrategy {
        &self.strategies[field.index()]
    }

    /// `(field, strategy)` in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldStrategy)> + '_ {
        Field::ALL.iter().copied().zip(self.strategies.iter())
    }

    /// Fields fed by generated content, with the record key they read
    pub fn external_fields(&self) -> Vec<(Field, &str)> {
        self.iter()
            .filter_map(|(field, strategy)| match strategy {
                FieldStrategy::ExternalWithFallback { external_field, .. } => {
                    Some((field, external_field.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// Defaults, then scope settings, then scope field overrides
    pub fn build(config: &ResolvedConfig) -> Self {
        let mut registry = Self::defaults();

        for (key, field) in SETTING_FIELDS {
            if let Some(value) = config.setting(key) {
                registry.register(*field, FieldStrategy::constant(value));
            }
        }

        for (header, value) in &config.field_overrides {
            if let Err(e) = registry.register_by_header(header, FieldStrategy::constant(value.as_str())) {
                warn!(header = %header, error = %e, "Ignoring field override");
            }
        }

        registry
    }

    /// Built-in strategy for every field
    pub fn defaults() -> Self {
        use ComputedFn as C;
        use Field as F;
        use FieldStrategy as S;

        let mut r = Self::empty();

        // Account and identity
        r.register(F::LsiAccount, S::passthrough(&["lsi_account"], ""));
        r.register(F::MetadataContact, S::passthrough(&["metadata_contact"], ""));
        r.register(F::ParentIsbn, S::passthrough(&["parent_isbn"], ""));
        r.register(F::Isbn, S::computed(C::AssignedIdentifier, &[]));
        r.register(F::RenditionBooktype, S::passthrough(&["rendition_booktype", "format"], ""));
        r.register(
            F::Title,
            S::computed(C::LengthLimited { context: "title".into() }, &["title"]),
        );
        r.register(F::Publisher, S::passthrough(&["publisher"], ""));
        r.register(F::Imprint, S::passthrough(&["imprint"], ""));

        // Files
        r.register(F::CoverPath, S::computed(C::AssetPath { file_type: "cover".into() }, &[]));
        r.register(
            F::InteriorPath,
            S::computed(C::AssetPath { file_type: "interior".into() }, &[]),
        );
        r.register(F::JacketPath, S::passthrough(&["jacket_path"], ""));
        r.register(F::MarketingImage, S::passthrough(&["marketing_image"], ""));

        // Title block
        r.register(
            F::Subtitle,
            S::computed(C::LengthLimited { context: "subtitle".into() }, &["subtitle"]),
        );
        r.register(F::SeriesName, S::passthrough(&["series_name", "series"], ""));
        r.register(F::SeriesNumber, S::passthrough(&["series_number"], ""));

        // Contributors
        r.register(
            F::ContributorOne,
            S::passthrough(&["contributor_one", "author", "contributors.0.name"], ""),
        );
        r.register(
            F::ContributorOneRole,
            S::passthrough(&["contributor_one_role", "contributors.0.role"], "A01"),
        );
        r.register(
            F::ContributorOneBio,
            S::external(
                "contributor_one_bio",
                S::computed(
                    C::LengthLimited { context: "contributor_bio".into() },
                    &["contributor_one_bio", "author_bio", "contributors.0.bio"],
                ),
            ),
        );
        r.register(
            F::ContributorOneAffiliations,
            S::passthrough(&["contributor_one_affiliations", "contributors.0.affiliations"], ""),
        );
        r.register(
            F::ContributorOneProfessionalPosition,
            S::passthrough(&["contributor_one_professional_position", "contributors.0.position"], ""),
        );
        r.register(
            F::ContributorOneLocation,
            S::passthrough(&["contributor_one_location", "contributors.0.location"], ""),
        );
        r.register(
            F::ContributorOneLocationTypeCode,
            S::passthrough(&["contributor_one_location_type_code"], ""),
        );
        r.register(
            F::ContributorOnePriorWork,
            S::passthrough(&["contributor_one_prior_work", "contributors.0.prior_work"], ""),
        );
        for (name, role, bio, index) in [
            (F::ContributorTwo, F::ContributorTwoRole, F::ContributorTwoBio, 1),
            (F::ContributorThree, F::ContributorThreeRole, F::ContributorThreeBio, 2),
        ] {
            let path = |attr: &str| format!("contributors.{}.{}", index, attr);
            r.register(
                name,
                S::Passthrough {
                    sources: vec![path("name")],
                    default: String::new(),
                },
            );
            r.register(
                role,
                S::Passthrough {
                    sources: vec![path("role")],
                    default: String::new(),
                },
            );
            r.register(
                bio,
                S::Computed {
                    function: C::LengthLimited { context: "contributor_bio".into() },
                    inputs: vec![path("bio")],
                },
            );
        }

        // Edition and dates
        r.register(F::EditionNumber, S::passthrough(&["edition_number"], ""));
        r.register(F::EditionDescription, S::passthrough(&["edition_description"], ""));
        r.register(F::Language, S::passthrough(&["language", "language_code"], "eng"));
        r.register(F::PubDate, S::computed(C::Date, &["publication_date", "pub_date"]));
        r.register(
            F::StreetDate,
            S::computed(C::Date, &["street_date", "publication_date", "pub_date"]),
        );
        r.register(F::TerritorialRights, S::passthrough(&["territorial_rights"], "World"));

        // Physical
        r.register(F::Pages, S::computed(C::PageCount, &[]));
        r.register(F::TrimWidth, S::computed(C::TrimWidth, &[]));
        r.register(F::TrimHeight, S::computed(C::TrimHeight, &[]));
        r.register(F::Weight, S::computed(C::Weight, &[]));
        r.register(F::WeightLbs, S::computed(C::WeightLbs, &[]));
        r.register(F::SpineWidth, S::computed(C::SpineWidth, &[]));
        r.register(F::Thickness, S::computed(C::Thickness, &[]));
        r.register(F::InteriorColor, S::passthrough(&["interior_color"], "Black & White"));
        r.register(F::InteriorPaper, S::computed(C::PaperLabel, &[]));
        r.register(F::Binding, S::computed(C::BindingLabel, &[]));
        r.register(F::CoverFinish, S::passthrough(&["cover_finish"], "Matte"));
        r.register(F::Illustrations, S::passthrough(&["illustrations"], ""));
        r.register(F::IllustrationNotes, S::passthrough(&["illustration_notes"], ""));

        // Distribution
        r.register(
            F::OrderTypeEligibility,
            S::passthrough(&["order_type_eligibility"], "POD"),
        );
        r.register(F::Returnable, S::passthrough(&["returnable"], "Yes-Destroy"));
        r.register(F::CartonPackQuantity, S::passthrough(&["carton_pack_quantity"], "1"));

        // Subjects
        r.register(
            F::BisacCategory,
            S::computed(
                C::BisacCategory { position: 1 },
                &["bisac_category", "bisac_codes", "categories"],
            ),
        );
        r.register(
            F::BisacCategory2,
            S::computed(
                C::BisacCategory { position: 2 },
                &["bisac_category_2", "bisac_codes", "categories"],
            ),
        );
        r.register(
            F::BisacCategory3,
            S::computed(
                C::BisacCategory { position: 3 },
                &["bisac_category_3", "bisac_codes", "categories"],
            ),
        );
        r.register(F::ThemaSubject1, S::passthrough(&["thema_subject_1"], ""));
        r.register(F::ThemaSubject2, S::passthrough(&["thema_subject_2"], ""));
        r.register(F::ThemaSubject3, S::passthrough(&["thema_subject_3"], ""));
        r.register(F::RegionalSubjects, S::passthrough(&["regional_subjects"], ""));
        r.register(F::Audience, S::passthrough(&["audience"], "General/Trade"));
        r.register(F::MinAge, S::passthrough(&["min_age"], ""));
        r.register(F::MaxAge, S::passthrough(&["max_age"], ""));
        r.register(F::MinGrade, S::passthrough(&["min_grade"], ""));
        r.register(F::MaxGrade, S::passthrough(&["max_grade"], ""));

        // Descriptive text
        let limited = |context: &str, inputs: &[&str]| {
            S::computed(C::LengthLimited { context: context.into() }, inputs)
        };
        r.register(F::Keywords, S::external("keywords", limited("keywords", &["keywords"])));
        r.register(
            F::ShortDescription,
            S::external(
                "short_description",
                limited("short_description", &["short_description", "summary"]),
            ),
        );
        r.register(
            F::LongDescription,
            S::external(
                "long_description",
                limited("long_description", &["long_description", "description"]),
            ),
        );
        r.register(
            F::AnnotationSummary,
            S::external("annotation", limited("annotation", &["annotation", "summary"])),
        );
        r.register(
            F::TableOfContents,
            limited("table_of_contents", &["table_of_contents", "toc"]),
        );
        r.register(
            F::ReviewQuotes,
            S::external("review_quotes", limited("review_quotes", &["review_quotes"])),
        );

        // Identification and stamping
        r.register(
            F::PublisherReferenceId,
            S::passthrough(&["publisher_reference_id", "book_id"], ""),
        );
        r.register(F::StampedTextLeft, S::passthrough(&["stamped_text_left"], ""));
        r.register(F::StampedTextCenter, S::passthrough(&["stamped_text_center"], ""));
        r.register(F::StampedTextRight, S::passthrough(&["stamped_text_right"], ""));
        r.register(F::SpecialCategory, S::passthrough(&["lsi_special_category"], ""));
        for (i, field) in [
            F::FlexField1,
            F::FlexField2,
            F::FlexField3,
            F::FlexField4,
            F::FlexField5,
        ]
        .into_iter()
        .enumerate()
        {
            r.register(
                field,
                S::Passthrough {
                    sources: vec![format!("lsi_flexfield{}", i + 1)],
                    default: String::new(),
                },
            );
        }

        // Prices
        for (price, discount, code) in TERRITORY_FIELDS {
            r.register(
                *price,
                S::computed(C::TerritoryPrice { territory: code.to_string() }, &[]),
            );
            r.register(
                *discount,
                S::computed(C::TerritoryDiscount { territory: code.to_string() }, &[]),
            );
        }

        r
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
