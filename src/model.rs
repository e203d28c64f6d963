use std::fmt::Display;

/// A printer model of the QL family, identified by its USB product ID.
///
/// Product IDs that we have never heard of map to [`Model::Unknown`]:
/// no feed-margin control, a single native mode and no usable
/// continuous-length bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Model {
    QL500,
    QL550,
    QL560,
    QL570,
    QL580N,
    QL650TD,
    QL700,
    QL700M,
    QL1050,
    QL1060N,
    Unknown,
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Model::*;

        let model_nr = match self {
            QL500 => "500",
            QL550 => "550",
            QL560 => "560",
            QL570 => "570",
            QL580N => "580N",
            QL650TD => "650TD",
            QL700 => "700",
            QL700M => "700M",
            QL1050 => "1050",
            QL1060N => "1060N",
            Unknown => return write!(f, "Unknown printer"),
        };

        write!(f, "Brother QL-{}", model_nr)
    }
}

impl From<u16> for Model {
    fn from(product_id: u16) -> Self {
        use Model::*;

        match product_id {
            0x2015 => QL500,
            0x2016 => QL550,
            0x2027 => QL560,
            0x2028 => QL570,
            0x2029 => QL580N,
            0x201b => QL650TD,
            0x2042 => QL700,
            0x2049 => QL700M,
            0x2020 => QL1050,
            0x202a => QL1060N,

            _ => Unknown,
        }
    }
}

impl Model {
    /// Whether the feed margin can be chosen via the margin command.
    /// On all other models, the margin is fixed by hardware.
    pub fn allows_feed_margin(&self) -> bool {
        use Model::*;

        matches!(self, QL500 | QL650TD | QL1050 | QL1060N)
    }

    /// Whether the printer only speaks the raster command language.
    /// Models with multiple native modes need an explicit mode switch at the
    /// start of every job.
    pub fn raster_only(&self) -> bool {
        use Model::*;

        !matches!(self, QL580N | QL650TD | QL1050 | QL1060N)
    }

    /// The allowed image height range on continuous-length tape, in pixels.
    pub fn continuous_length_bounds(&self) -> (u32, u32) {
        use Model::*;

        let min = match self {
            QL570 | QL580N | QL700 | QL700M => 150,
            Unknown => 0,
            _ => 295,
        };

        let max = match self {
            QL1050 | QL1060N => 35433,
            Unknown => 0,
            _ => 11811,
        };

        (min, max)
    }

    /// Size of one raster-graphics-transfer record in bytes.
    /// The "wide" printers have a 1296 pin head and therefore longer records.
    pub(crate) fn rgt_size_bytes(&self) -> u8 {
        use Model::*;

        match self {
            QL1050 | QL1060N => 162,
            _ => 90,
        }
    }
}
