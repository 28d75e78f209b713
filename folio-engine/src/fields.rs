//! Canonical target fields of the wholesale intake sheet
//!
//! `Field` is a closed enum; its declaration order is the header order of the
//! output table. `OutputRecord` stores exactly one string per variant, so a
//! compiled record can never be missing a column.

use serde::{Serialize, Serializer};
use std::fmt;

macro_rules! define_fields {
    ($($variant:ident => $header:literal),* $(,)?) => {
        /// One column of the intake sheet
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $($variant),*
        }

        impl Field {
            /// All fields in canonical (header) order
            pub const ALL: &'static [Field] = &[$(Field::$variant),*];

            /// Column header text
            pub fn header(self) -> &'static str {
                match self {
                    $(Field::$variant => $header),*
                }
            }
        }
    };
}

define_fields! {
    LsiAccount => "Lightning Source Account #",
    MetadataContact => "Metadata Contact Dictionary",
    ParentIsbn => "Parent ISBN",
    Isbn => "ISBN or SKU",
    RenditionBooktype => "Rendition /Booktype",
    Title => "Title",
    Publisher => "Publisher",
    Imprint => "Imprint",
    CoverPath => "Cover Path / Filename",
    InteriorPath => "Interior Path / Filename",
    JacketPath => "Jacket Path / Filename",
    MarketingImage => "Marketing Image",
    Subtitle => "Subtitle",
    SeriesName => "Series Name",
    SeriesNumber => "# in Series",
    ContributorOne => "Contributor One",
    ContributorOneRole => "Contributor One Role",
    ContributorOneBio => "Contributor One BIO",
    ContributorOneAffiliations => "Contributor One Affiliations",
    ContributorOneProfessionalPosition => "Contributor One Professional Position",
    ContributorOneLocation => "Contributor One Location",
    ContributorOneLocationTypeCode => "Contributor One Location Type Code",
    ContributorOnePriorWork => "Contributor One Prior Work",
    ContributorTwo => "Contributor Two",
    ContributorTwoRole => "Contributor Two Role",
    ContributorTwoBio => "Contributor Two BIO",
    ContributorThree => "Contributor Three",
    ContributorThreeRole => "Contributor Three Role",
    ContributorThreeBio => "Contributor Three BIO",
    EditionNumber => "Edition Number",
    EditionDescription => "Edition Description",
    Language => "Language Code",
    PubDate => "Pub Date",
    StreetDate => "Street Date",
    TerritorialRights => "Territorial Rights",
    Pages => "Pages",
    TrimWidth => "Custom Trim Width (inches)",
    TrimHeight => "Custom Trim Height (inches)",
    Weight => "Weight",
    WeightLbs => "Weight(Lbs)",
    SpineWidth => "Spine Width (inches)",
    Thickness => "Overall Thickness (inches)",
    InteriorColor => "Interior Color",
    InteriorPaper => "Interior Paper",
    Binding => "Binding",
    CoverFinish => "Cover Finish",
    Illustrations => "# Illustrations",
    IllustrationNotes => "Illustration Notes",
    OrderTypeEligibility => "Order Type Eligibility",
    Returnable => "Returnable",
    CartonPackQuantity => "Carton Pack Quantity",
    BisacCategory => "BISAC Category",
    BisacCategory2 => "BISAC Category 2",
    BisacCategory3 => "BISAC Category 3",
    ThemaSubject1 => "Thema Subject 1",
    ThemaSubject2 => "Thema Subject 2",
    ThemaSubject3 => "Thema Subject 3",
    RegionalSubjects => "Regional Subjects",
    Audience => "Audience",
    MinAge => "Min Age",
    MaxAge => "Max Age",
    MinGrade => "Min Grade",
    MaxGrade => "Max Grade",
    Keywords => "Keywords",
    ShortDescription => "Short Description",
    LongDescription => "Long Description",
    AnnotationSummary => "Annotation / Summary",
    TableOfContents => "Table of Contents",
    ReviewQuotes => "Review Quote(s)",
    PublisherReferenceId => "Publisher Reference ID",
    StampedTextLeft => "Stamped Text LEFT",
    StampedTextCenter => "Stamped Text CENTER",
    StampedTextRight => "Stamped Text RIGHT",
    SpecialCategory => "LSI Special Category",
    FlexField1 => "LSI FlexField1",
    FlexField2 => "LSI FlexField2",
    FlexField3 => "LSI FlexField3",
    FlexField4 => "LSI FlexField4",
    FlexField5 => "LSI FlexField5",
    UsPrice => "US Suggested List Price",
    UsDiscount => "US Wholesale Discount",
    UkPrice => "UK Suggested List Price",
    UkDiscount => "UK Wholesale Discount (%)",
    EuPrice => "EU Suggested List Price (mode 2)",
    EuDiscount => "EU Wholesale Discount % (Mode 2)",
    AuPrice => "AU Suggested List Price (mode 2)",
    AuDiscount => "AU Wholesale Discount % (Mode 2)",
    CaPrice => "CA Suggested List Price (mode 2)",
    CaDiscount => "CA Wholesale Discount % (Mode 2)",
    GcPrice => "GC Suggested List Price (mode 2)",
    GcDiscount => "GC Wholesale Discount % (Mode 2)",
    UsBr1Price => "USBR1 Suggested List Price (mode 2)",
    UsBr1Discount => "USBR1 Wholesale Discount % (Mode 2)",
    UsDe1Price => "USDE1 Suggested List Price (mode 2)",
    UsDe1Discount => "USDE1 Wholesale Discount % (Mode 2)",
    UsRu1Price => "USRU1 Suggested List Price (mode 2)",
    UsRu1Discount => "USRU1 Wholesale Discount % (Mode 2)",
    UsPl1Price => "USPL1 Suggested List Price (mode 2)",
    UsPl1Discount => "USPL1 Wholesale Discount % (Mode 2)",
    UsKr1Price => "USKR1 Suggested List Price (mode 2)",
    UsKr1Discount => "USKR1 Wholesale Discount % (Mode 2)",
    UsCn1Price => "USCN1 Suggested List Price (mode 2)",
    UsCn1Discount => "USCN1 Wholesale Discount % (Mode 2)",
    UsIn1Price => "USIN1 Suggested List Price (mode 2)",
    UsIn1Discount => "USIN1 Wholesale Discount % (Mode 2)",
    UsJp2Price => "USJP2 Suggested List Price (mode 2)",
    UsJp2Discount => "USJP2 Wholesale Discount % (Mode 2)",
    UaeUsdPrice => "UAEUSD Suggested List Price (mode 2)",
    UaeUsdDiscount => "UAEUSD Wholesale Discount % (Mode 2)",
}

impl Field {
    /// Number of target fields
    pub const COUNT: usize = Field::ALL.len();

    /// Position in canonical order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look a field up by its exact header text
    pub fn from_header(header: &str) -> Option<Field> {
        let header = header.trim();
        Field::ALL.iter().copied().find(|f| f.header() == header)
    }

    /// Header row in canonical order
    pub fn headers() -> Vec<&'static str> {
        Field::ALL.iter().map(|f| f.header()).collect()
    }
}

/// `(price field, discount field, territory code)` for every market column pair
pub const TERRITORY_FIELDS: &[(Field, Field, &str)] = &[
    (Field::UsPrice, Field::UsDiscount, "US"),
    (Field::UkPrice, Field::UkDiscount, "UK"),
    (Field::EuPrice, Field::EuDiscount, "EU"),
    (Field::AuPrice, Field::AuDiscount, "AU"),
    (Field::CaPrice, Field::CaDiscount, "CA"),
    (Field::GcPrice, Field::GcDiscount, "GC"),
    (Field::UsBr1Price, Field::UsBr1Discount, "USBR1"),
    (Field::UsDe1Price, Field::UsDe1Discount, "USDE1"),
    (Field::UsRu1Price, Field::UsRu1Discount, "USRU1"),
    (Field::UsPl1Price, Field::UsPl1Discount, "USPL1"),
    (Field::UsKr1Price, Field::UsKr1Discount, "USKR1"),
    (Field::UsCn1Price, Field::UsCn1Discount, "USCN1"),
    (Field::UsIn1Price, Field::UsIn1Discount, "USIN1"),
    (Field::UsJp2Price, Field::UsJp2Discount, "USJP2"),
    (Field::UaeUsdPrice, Field::UaeUsdDiscount, "UAEUSD"),
];

impl Field {
    /// Territory code when this is a list price column
    pub fn price_territory(self) -> Option<&'static str> {
        TERRITORY_FIELDS
            .iter()
            .find(|(price, _, _)| *price == self)
            .map(|(_, _, code)| *code)
    }

    /// Price column for a territory code
    pub fn price_field(code: &str) -> Option<Field> {
        TERRITORY_FIELDS
            .iter()
            .find(|(_, _, c)| c.eq_ignore_ascii_case(code))
            .map(|(price, _, _)| *price)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.header())
    }
}

/// One compiled row: a value for every [`Field`], empty string allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    values: Vec<String>,
}

impl OutputRecord {
    /// Record with every field set to the empty string
    pub fn new() -> Self {
        Self {
            values: vec![String::new(); Field::COUNT],
        }
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    pub fn is_empty(&self, field: Field) -> bool {
        self.values[field.index()].trim().is_empty()
    }

    /// `(field, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .iter()
            .copied()
            .zip(self.values.iter().map(|v| v.as_str()))
    }

    /// Values in canonical order, for table output
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl Default for OutputRecord {
    fn default() -> Self {
        Self::new()
    }
}
