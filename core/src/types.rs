//! Domain values and read-only accessors over console responses.
//!
//! # Design
//! Responses stay `Element` trees; the accessors here only borrow one and
//! expose the handful of fields callers actually read. Enumerations carry
//! the exact strings the console expects on the wire.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::xml::Element;

/// Why a vulnerability exception is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ExceptionReason {
    #[serde(rename = "False Positive")]
    FalsePositive,
    #[serde(rename = "Compensating Control")]
    CompensatingControl,
    #[serde(rename = "Acceptable Use")]
    AcceptableUse,
    #[serde(rename = "Acceptable Risk")]
    AcceptableRisk,
    #[serde(rename = "Other")]
    Other,
}

impl ExceptionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionReason::FalsePositive => "False Positive",
            ExceptionReason::CompensatingControl => "Compensating Control",
            ExceptionReason::AcceptableUse => "Acceptable Use",
            ExceptionReason::AcceptableRisk => "Acceptable Risk",
            ExceptionReason::Other => "Other",
        }
    }
}

/// Which findings a vulnerability exception covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ExceptionScope {
    #[serde(rename = "All Instances")]
    AllInstances,
    #[serde(rename = "All Instances on a Specific Asset")]
    AllInstancesOnSpecificAsset,
    #[serde(rename = "Specific Instance of Specific Asset")]
    SpecificInstanceOfSpecificAsset,
}

impl ExceptionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionScope::AllInstances => "All Instances",
            ExceptionScope::AllInstancesOnSpecificAsset => "All Instances on a Specific Asset",
            ExceptionScope::SpecificInstanceOfSpecificAsset => "Specific Instance of Specific Asset",
        }
    }
}

/// Generation state of a report in the report history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSummaryStatus {
    Started,
    Generated,
    Failed,
    Aborted,
    Unknown,
}

impl ReportSummaryStatus {
    /// Unrecognised status strings map to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "Started" => ReportSummaryStatus::Started,
            "Generated" => ReportSummaryStatus::Generated,
            "Failed" => ReportSummaryStatus::Failed,
            "Aborted" => ReportSummaryStatus::Aborted,
            _ => ReportSummaryStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportSummaryStatus::Started => "Started",
            ReportSummaryStatus::Generated => "Generated",
            ReportSummaryStatus::Failed => "Failed",
            ReportSummaryStatus::Aborted => "Aborted",
            ReportSummaryStatus::Unknown => "Unknown",
        }
    }
}

/// Quick access to the description and references of a
/// `VulnerabilityDetailsResponse`.
#[derive(Debug, Clone)]
pub struct VulnerabilityDetails {
    element: Element,
}

impl VulnerabilityDetails {
    pub fn new(element: Element) -> Self {
        VulnerabilityDetails { element }
    }

    /// Text of the first `description` element anywhere in the response.
    pub fn description(&self) -> Option<&str> {
        self.element.descendant("description").and_then(Element::text)
    }

    /// Reference texts grouped by their `source` attribute.
    ///
    /// Within a source, references keep document order. Entries without a
    /// `source` attribute or text are skipped.
    pub fn references(&self) -> BTreeMap<String, Vec<String>> {
        let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let Some(references) = self.element.descendant("references") else {
            return result;
        };
        for reference in references.children() {
            if let (Some(source), Some(text)) = (reference.attr("source"), reference.text()) {
                result
                    .entry(source.to_string())
                    .or_default()
                    .push(text.to_string());
            }
        }
        result
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn into_element(self) -> Element {
        self.element
    }
}

/// One entry of a `ReportHistoryResponse`.
#[derive(Debug, Clone, Copy)]
pub struct ReportSummary<'a> {
    element: &'a Element,
}

impl<'a> ReportSummary<'a> {
    pub fn new(element: &'a Element) -> Self {
        ReportSummary { element }
    }

    pub fn id(&self) -> Option<&'a str> {
        self.element.attr("id")
    }

    pub fn cfg_id(&self) -> Option<&'a str> {
        self.element.attr("cfg-id")
    }

    pub fn status(&self) -> ReportSummaryStatus {
        self.element
            .attr("status")
            .map(ReportSummaryStatus::parse)
            .unwrap_or(ReportSummaryStatus::Unknown)
    }

    pub fn generated_on(&self) -> Option<&'a str> {
        self.element.attr("generated-on")
    }

    /// Server-relative location of the rendered report, for `get_report`.
    pub fn report_uri(&self) -> Option<&'a str> {
        self.element.attr("report-URI")
    }
}
