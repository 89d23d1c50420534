//! Ledger column allow-list, cell coercion and import defaults.
//!
//! Ledger spreadsheets use the Chinese column headers of the official
//! template. Every header must appear in [`COLUMN_MAP`]; anything else
//! aborts the import rather than being stored under a guessed name.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use geopark_ingest_models::LedgerField;
use geopark_tuban_models::{NewViolationRecord, RectifyStatus, YesNo};

use crate::ImportError;

/// Template header to internal field.
pub const COLUMN_MAP: &[(&str, LedgerField)] = &[
    ("图斑编号", LedgerField::TubanCode),
    ("所属地质公园名称", LedgerField::ParkName),
    ("所在功能区", LedgerField::FuncZone),
    ("活动/设施名称", LedgerField::FacilityName),
    ("经度", LedgerField::Longitude),
    ("纬度", LedgerField::Latitude),
    ("占地面积", LedgerField::Area),
    ("影像时相", LedgerField::ImageDate),
    ("建设单位", LedgerField::BuildUnit),
    ("建设时间", LedgerField::BuildTime),
    ("是否有审批手续", LedgerField::HasApproval),
    ("审批文号", LedgerField::ApprovalNo),
    ("发现时间", LedgerField::DiscoverTime),
    ("发现方式", LedgerField::DiscoverMethod),
    ("现场核查时间", LedgerField::CheckTime),
    ("核查人员", LedgerField::CheckPerson),
    ("核查结论", LedgerField::CheckResult),
    ("问题类型", LedgerField::ProblemType),
    ("问题描述", LedgerField::ProblemDesc),
    ("涉及地质遗迹类型", LedgerField::GeoHeritageType),
    ("影响程度", LedgerField::ImpactLevel),
    ("是否违法违规", LedgerField::IsIllegal),
    ("违反法规条款", LedgerField::ViolatedLaw),
    ("整改措施", LedgerField::RectifyMeasure),
    ("整改时限", LedgerField::RectifyDeadline),
    ("整改进展", LedgerField::RectifyStatus),
    ("整改验收时间", LedgerField::RectifyVerifyTime),
    ("验收人员", LedgerField::VerifyPerson),
    ("是否销号", LedgerField::IsClosed),
    ("是否处罚", LedgerField::IsPunished),
    ("处罚形式", LedgerField::PunishType),
    ("罚款金额", LedgerField::FineAmount),
    ("处罚文书编号", LedgerField::PunishDocNo),
    ("台账来源", LedgerField::DataSource),
    ("是否为巡查点", LedgerField::IsPatrolPoint),
    ("责任部门/责任人", LedgerField::ResponsibleDept),
    ("附件材料", LedgerField::Attachments),
    ("备注", LedgerField::Remark),
];

/// Values filled in for fields a row leaves blank.
pub const DEFAULTS: &[(LedgerField, &str)] = &[
    (LedgerField::RectifyStatus, RectifyStatus::NOT_STARTED),
    (LedgerField::IsClosed, "否"),
    (LedgerField::IsPunished, "否"),
    (LedgerField::IsPatrolPoint, "否"),
    (LedgerField::HasApproval, "否"),
    (LedgerField::IsIllegal, "待定"),
];

/// Fields a row must carry to be imported.
pub const REQUIRED: &[LedgerField] = &[LedgerField::TubanCode, LedgerField::ParkName];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn normalize_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

/// Looks up the field for a ledger header.
#[must_use]
pub fn lookup(header: &str) -> Option<LedgerField> {
    let header = normalize_header(header);
    COLUMN_MAP
        .iter()
        .find(|(name, _)| *name == header)
        .map(|(_, field)| *field)
}

/// Resolves every header of a ledger, in column order.
///
/// # Errors
///
/// Returns [`ImportError::UnknownColumn`] for the first header not in
/// [`COLUMN_MAP`].
pub fn resolve_headers<S: AsRef<str>>(headers: &[S]) -> Result<Vec<LedgerField>, ImportError> {
    headers
        .iter()
        .map(|header| {
            let header = header.as_ref();
            lookup(header)
                .ok_or_else(|| ImportError::UnknownColumn(normalize_header(header).to_string()))
        })
        .collect()
}

/// Parses a decimal cell, treating garbage as absent.
#[must_use]
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses a date cell in any of the common ledger spellings, treating
/// garbage as absent.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// A row that could not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub LedgerField);

/// Collects the non-blank cells of a row by field, then fills in
/// [`DEFAULTS`] for whatever is still missing.
#[must_use]
pub fn collect_cells<S: AsRef<str>>(
    fields: &[LedgerField],
    cells: &[S],
) -> BTreeMap<LedgerField, String> {
    let mut values = BTreeMap::new();

    for (field, cell) in fields.iter().zip(cells) {
        let cell = cell.as_ref().trim();
        if !cell.is_empty() {
            values.insert(*field, cell.to_string());
        }
    }

    for (field, default) in DEFAULTS {
        values
            .entry(*field)
            .or_insert_with(|| (*default).to_string());
    }

    values
}

fn coerce_decimal(values: &BTreeMap<LedgerField, String>, field: LedgerField) -> Option<f64> {
    let raw = values.get(&field)?;
    let parsed = parse_decimal(raw);
    if parsed.is_none() {
        log::debug!("Dropping unparseable {field} value {raw:?}");
    }
    parsed
}

fn coerce_date(values: &BTreeMap<LedgerField, String>, field: LedgerField) -> Option<NaiveDate> {
    let raw = values.get(&field)?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        log::debug!("Dropping unparseable {field} value {raw:?}");
    }
    parsed
}

/// Builds a record from one ledger row.
///
/// # Errors
///
/// Returns [`MissingField`] if a [`REQUIRED`] field is blank.
pub fn parse_row<S: AsRef<str>>(
    fields: &[LedgerField],
    cells: &[S],
) -> Result<NewViolationRecord, MissingField> {
    let mut values = collect_cells(fields, cells);

    if let Some(missing) = REQUIRED.iter().find(|f| !values.contains_key(*f)) {
        return Err(MissingField(*missing));
    }

    let mut text = |field: LedgerField| values.remove(&field);

    let mut record = NewViolationRecord {
        tuban_code: text(LedgerField::TubanCode).unwrap_or_default(),
        park_name: text(LedgerField::ParkName).unwrap_or_default(),
        func_zone: text(LedgerField::FuncZone),
        facility_name: text(LedgerField::FacilityName),
        build_unit: text(LedgerField::BuildUnit),
        has_approval: text(LedgerField::HasApproval),
        approval_no: text(LedgerField::ApprovalNo),
        discover_method: text(LedgerField::DiscoverMethod),
        check_person: text(LedgerField::CheckPerson),
        check_result: text(LedgerField::CheckResult),
        problem_type: text(LedgerField::ProblemType),
        problem_desc: text(LedgerField::ProblemDesc),
        geo_heritage_type: text(LedgerField::GeoHeritageType),
        impact_level: text(LedgerField::ImpactLevel),
        is_illegal: text(LedgerField::IsIllegal),
        violated_law: text(LedgerField::ViolatedLaw),
        rectify_measure: text(LedgerField::RectifyMeasure),
        rectify_status: text(LedgerField::RectifyStatus).map(RectifyStatus::from),
        verify_person: text(LedgerField::VerifyPerson),
        is_closed: text(LedgerField::IsClosed).map(|v| YesNo::from_flag(&v)),
        is_punished: text(LedgerField::IsPunished),
        punish_type: text(LedgerField::PunishType),
        punish_doc_no: text(LedgerField::PunishDocNo),
        data_source: text(LedgerField::DataSource),
        is_patrol_point: text(LedgerField::IsPatrolPoint),
        responsible_dept: text(LedgerField::ResponsibleDept),
        attachments: text(LedgerField::Attachments),
        remark: text(LedgerField::Remark),
        ..NewViolationRecord::default()
    };

    record.longitude = coerce_decimal(&values, LedgerField::Longitude);
    record.latitude = coerce_decimal(&values, LedgerField::Latitude);
    record.area = coerce_decimal(&values, LedgerField::Area);
    record.fine_amount = coerce_decimal(&values, LedgerField::FineAmount);
    record.image_date = coerce_date(&values, LedgerField::ImageDate);
    record.build_time = coerce_date(&values, LedgerField::BuildTime);
    record.discover_time = coerce_date(&values, LedgerField::DiscoverTime);
    record.check_time = coerce_date(&values, LedgerField::CheckTime);
    record.rectify_deadline = coerce_date(&values, LedgerField::RectifyDeadline);
    record.rectify_verify_time = coerce_date(&values, LedgerField::RectifyVerifyTime);

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn every_template_column_is_mapped_once() {
        let mut headers: Vec<&str> = COLUMN_MAP.iter().map(|(h, _)| *h).collect();
        assert_eq!(headers.len(), 38);
        headers.sort_unstable();
        headers.dedup();
        assert_eq!(headers.len(), 38);
    }

    #[test]
    fn headers_are_trimmed_before_lookup() {
        assert_eq!(lookup(" 图斑编号 "), Some(LedgerField::TubanCode));
        assert_eq!(lookup("\u{feff}图斑编号"), Some(LedgerField::TubanCode));
        assert_eq!(lookup("罚款金额"), Some(LedgerField::FineAmount));
        assert_eq!(lookup("tuban_code"), None);
    }

    #[test]
    fn unknown_header_is_rejected() {
        let err = resolve_headers(&["图斑编号", " 颜色 "]).unwrap_err();
        assert!(matches!(err, ImportError::UnknownColumn(ref h) if h == "颜色"));
    }

    #[test]
    fn lenient_coercion() {
        assert_eq!(parse_decimal(" 110.5 "), Some(110.5));
        assert_eq!(parse_decimal("1,200"), Some(1200.0));
        assert_eq!(parse_decimal("n/a"), None);
        assert_eq!(parse_decimal("NaN"), None);

        assert_eq!(parse_date("2024-05-06"), Some(date(2024, 5, 6)));
        assert_eq!(parse_date("2024/5/6"), Some(date(2024, 5, 6)));
        assert_eq!(parse_date("2024年5月6日"), Some(date(2024, 5, 6)));
        assert_eq!(parse_date("2024-05-06 08:30:00"), Some(date(2024, 5, 6)));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn defaults_fill_blank_flags_only() {
        let fields = resolve_headers(&["图斑编号", "所属地质公园名称", "是否销号", "整改进展"]).unwrap();
        let record = parse_row(&fields, &["TB001", "Songshan", "是", ""]).unwrap();

        assert_eq!(record.is_closed, Some(YesNo::Yes));
        assert_eq!(record.rectify_status, Some(RectifyStatus::NotStarted));
        assert_eq!(record.is_punished.as_deref(), Some("否"));
        assert_eq!(record.is_patrol_point.as_deref(), Some("否"));
        assert_eq!(record.has_approval.as_deref(), Some("否"));
        assert_eq!(record.is_illegal.as_deref(), Some("待定"));
    }

    #[test]
    fn every_template_column_has_its_own_field() {
        let mut fields: Vec<LedgerField> = COLUMN_MAP.iter().map(|(_, f)| *f).collect();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), COLUMN_MAP.len());
    }

    #[test]
    fn row_coerces_typed_fields() {
        let fields = resolve_headers(&[
            "图斑编号",
            "所属地质公园名称",
            "经度",
            "纬度",
            "整改时限",
            "罚款金额",
            "所在功能区",
        ])
        .unwrap();
        let record = parse_row(
            &fields,
            &["TB001", "Songshan", "112.95", "bad", "2025-03-01", "5000", " 核心区 "],
        )
        .unwrap();

        assert_eq!(record.longitude, Some(112.95));
        assert_eq!(record.latitude, None);
        assert_eq!(record.rectify_deadline, Some(date(2025, 3, 1)));
        assert_eq!(record.fine_amount, Some(5000.0));
        assert_eq!(record.func_zone.as_deref(), Some("核心区"));
    }

    #[test]
    fn check_and_penalty_columns_are_kept() {
        let fields = resolve_headers(&[
            "图斑编号",
            "所属地质公园名称",
            "建设时间",
            "审批文号",
            "现场核查时间",
            "核查人员",
            "核查结论",
            "涉及地质遗迹类型",
            "违反法规条款",
            "整改措施",
            "验收人员",
            "处罚形式",
            "处罚文书编号",
            "附件材料",
        ])
        .unwrap();
        let record = parse_row(
            &fields,
            &[
                "TB001",
                "Songshan",
                "2019/06/01",
                "豫审〔2019〕12号",
                "2024-08-02",
                "Li",
                "属实",
                "地貌景观",
                "第十八条",
                "拆除复绿",
                "Wang",
                "罚款",
                "罚字〔2024〕3号",
                "photos/tb001.zip",
            ],
        )
        .unwrap();

        assert_eq!(record.build_time, Some(date(2019, 6, 1)));
        assert_eq!(record.approval_no.as_deref(), Some("豫审〔2019〕12号"));
        assert_eq!(record.check_time, Some(date(2024, 8, 2)));
        assert_eq!(record.check_person.as_deref(), Some("Li"));
        assert_eq!(record.check_result.as_deref(), Some("属实"));
        assert_eq!(record.geo_heritage_type.as_deref(), Some("地貌景观"));
        assert_eq!(record.violated_law.as_deref(), Some("第十八条"));
        assert_eq!(record.rectify_measure.as_deref(), Some("拆除复绿"));
        assert_eq!(record.verify_person.as_deref(), Some("Wang"));
        assert_eq!(record.punish_type.as_deref(), Some("罚款"));
        assert_eq!(record.punish_doc_no.as_deref(), Some("罚字〔2024〕3号"));
        assert_eq!(record.attachments.as_deref(), Some("photos/tb001.zip"));
    }

    #[test]
    fn missing_required_field() {
        let fields = resolve_headers(&["图斑编号", "所属地质公园名称"]).unwrap();
        assert_eq!(
            parse_row(&fields, &["TB001", "  "]),
            Err(MissingField(LedgerField::ParkName))
        );
        assert_eq!(
            parse_row(&fields, &["", "Songshan"]),
            Err(MissingField(LedgerField::TubanCode))
        );
    }
}
