// ✉️ Dispute Letter - fixed template, one finding in, one PDF out
// Layout positions are in millimetres from the top-left of an A4 page

use crate::findings::Finding;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH_PT: f32 = 595.0;
const PAGE_HEIGHT_PT: f32 = 842.0;
const PT_PER_MM: f32 = 72.0 / 25.4;
// Courier glyphs are 600/1000 em wide, so centering is exact
const COURIER_ADVANCE: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct LetterLine {
    pub text: String,
    pub x_mm: f32,
    pub y_mm: f32,
    pub font_size: f32,
    pub centered: bool,
}

impl LetterLine {
    fn body(text: String, y_mm: f32) -> Self {
        LetterLine {
            text,
            x_mm: 20.0,
            y_mm,
            font_size: 12.0,
            centered: false,
        }
    }
}

/// A rendered dispute notice, ready to export.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeLetter {
    pub file_name: String,
    pub lines: Vec<LetterLine>,
}

impl DisputeLetter {
    /// Plain-text rendering, one template line per line
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Encode as a single-page PDF
    pub fn to_pdf(&self) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut operations = Vec::new();
        for line in &self.lines {
            let (x, y) = line.position_pt();
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), line.font_size.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(line.text.as_str())]));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let encoded = content.encode().context("Failed to encode letter content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH_PT.into(), PAGE_HEIGHT_PT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).context("Failed to write letter PDF")?;
        Ok(bytes)
    }
}

impl LetterLine {
    /// PDF user-space origin of the line (bottom-left based)
    fn position_pt(&self) -> (f32, f32) {
        let x = if self.centered {
            let width = self.text.chars().count() as f32 * COURIER_ADVANCE * self.font_size;
            self.x_mm * PT_PER_MM - width / 2.0
        } else {
            self.x_mm * PT_PER_MM
        };
        (x, PAGE_HEIGHT_PT - self.y_mm * PT_PER_MM)
    }
}

pub struct LetterGenerator;

impl LetterGenerator {
    /// Fill the notice template for one finding.
    pub fn generate(finding: &Finding, date: NaiveDate) -> DisputeLetter {
        let title = &finding.title;
        let code = &finding.code;

        let lines = vec![
            LetterLine {
                text: "FORMAL DISPUTE NOTICE".to_string(),
                x_mm: 105.0,
                y_mm: 20.0,
                font_size: 22.0,
                centered: true,
            },
            LetterLine::body(format!("Date: {}", date.format("%-m/%-d/%Y")), 40.0),
            LetterLine::body(format!("Subject: Violation of {}", code), 50.0),
            LetterLine::body(format!("Notice regarding: {}", title), 60.0),
            LetterLine::body("To Whom It May Concern,".to_string(), 80.0),
            LetterLine::body(
                format!("I am writing to formally dispute the following item: {}.", title),
                90.0,
            ),
            LetterLine::body(
                format!("Under {}, this information is inaccurate or unverified.", code),
                100.0,
            ),
            LetterLine::body(
                "Please investigate and remove this item within 30 days.".to_string(),
                110.0,
            ),
            LetterLine::body("Sincerely, [Your Name]".to_string(), 130.0),
        ];

        DisputeLetter {
            file_name: format!("dispute-{}.pdf", finding.slug()),
            lines,
        }
    }

    /// Same as `generate`, dated today (local time)
    pub fn generate_today(finding: &Finding) -> DisputeLetter {
        Self::generate(finding, chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn late_payment() -> Finding {
        Finding::new(
            "Inaccurate Late Payment",
            "15 USC 1681i",
            "Report shows unverified late status.",
        )
    }

    #[test]
    fn test_template_substitution() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let letter = LetterGenerator::generate(&late_payment(), date);

        let expected = "FORMAL DISPUTE NOTICE\n\
            Date: 3/7/2024\n\
            Subject: Violation of 15 USC 1681i\n\
            Notice regarding: Inaccurate Late Payment\n\
            To Whom It May Concern,\n\
            I am writing to formally dispute the following item: Inaccurate Late Payment.\n\
            Under 15 USC 1681i, this information is inaccurate or unverified.\n\
            Please investigate and remove this item within 30 days.\n\
            Sincerely, [Your Name]";
        assert_eq!(letter.to_text(), expected);
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let letter = LetterGenerator::generate(&late_payment(), date);
        assert_eq!(letter.file_name, "dispute-inaccurate-late-payment.pdf");

        let metro = Finding::new("Metro 2 Data Format Error", "FCRA Sec 611", "x");
        let letter = LetterGenerator::generate(&metro, date);
        assert_eq!(letter.file_name, "dispute-metro-2-data-format-error.pdf");
    }

    #[test]
    fn test_deterministic_for_same_date() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let a = LetterGenerator::generate(&late_payment(), date);
        let b = LetterGenerator::generate(&late_payment(), date);
        assert_eq!(a, b);
    }

    #[test]
    fn test_heading_is_centered() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let letter = LetterGenerator::generate(&late_payment(), date);
        let heading = &letter.lines[0];

        let (x, _) = heading.position_pt();
        let width = heading.text.len() as f32 * COURIER_ADVANCE * heading.font_size;
        let center = x + width / 2.0;
        assert!((center - PAGE_WIDTH_PT / 2.0).abs() < 1.0);
    }

    #[test]
    fn test_pdf_output() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let letter = LetterGenerator::generate(&late_payment(), date);
        let bytes = letter.to_pdf().unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
