//! PDF report generation.
//!
//! Reports are assembled with genpdf: a header block, a framed table
//! and trailing notes. Text assembly is kept in pure helpers so the
//! content can be tested without rendering; rendering itself needs a
//! TTF font family on disk (ZELA_FONT_DIR, default `./fonts`,
//! LiberationSans).

use std::fmt;

use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{Document, Element, SimplePageDecorator};

use crate::models::{
    CustodianProcess, InspectionEvent, InspectionResponseWithSchool, ProcessStageEvent, School,
    WaterReading,
};
use crate::permit::{PermitBand, PermitStatus};

#[derive(Debug)]
pub enum ReportError {
    /// Font family could not be loaded; reported upstream as 503.
    Font(genpdf::error::Error),
    Render(genpdf::error::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Font(e) => write!(f, "failed to load report fonts: {}", e),
            ReportError::Render(e) => write!(f, "failed to render report: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}

fn font_dir() -> String {
    std::env::var("ZELA_FONT_DIR").unwrap_or_else(|_| "./fonts".to_string())
}

fn load_font() -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, ReportError> {
    genpdf::fonts::from_files(&font_dir(), "LiberationSans", None).map_err(ReportError::Font)
}

fn configure_document(title: &str) -> Result<Document, ReportError> {
    let font_family = load_font()?;
    let mut doc = Document::new(font_family);
    doc.set_title(title);
    doc.set_font_size(10);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);
    Ok(doc)
}

fn render(doc: Document) -> Result<Vec<u8>, ReportError> {
    let mut buf = Vec::new();
    doc.render(&mut buf).map_err(ReportError::Render)?;
    Ok(buf)
}

fn push_heading(doc: &mut Document, text: &str) {
    doc.push(Paragraph::new(text).styled(Style::new().bold().with_font_size(13)));
    doc.push(Break::new(1));
}

fn yes_no(value: bool) -> &'static str {
    if value { "Sim" } else { "Não" }
}

/// Display label for a workflow stage.
pub fn stage_label(stage: i32) -> &'static str {
    match stage {
        1 => "Abertura do processo",
        2 => "Análise documental",
        3 => "Vistoria da unidade",
        4 => "Parecer jurídico",
        5 => "Assinatura do termo",
        6 => "Emissão da permissão",
        7 => "Processo concluído",
        _ => "Etapa desconhecida",
    }
}

/// Display label for a permit validity band.
pub fn band_label(band: PermitBand) -> &'static str {
    match band {
        PermitBand::Ok => "Dentro da validade",
        PermitBand::Warning => "Renovação próxima",
        PermitBand::Expired => "Permissão vencida",
    }
}

/// Header lines of the monthly water report.
pub fn water_report_header(school: &School, year: i32, month: u32) -> Vec<String> {
    vec![
        format!("Escola: {} ({}/{})", school.name, school.city, school.state),
        format!("Polo: {}  Diretor(a): {}", school.polo, school.director_name),
        format!("Competência: {:02}/{}", month, year),
    ]
}

/// One table row of the monthly water report.
pub fn water_report_row(reading: &WaterReading) -> [String; 5] {
    [
        reading.reading_date.format("%d/%m/%Y").to_string(),
        format!("{:.1}", reading.meter_value),
        format!("{:.2}", reading.consumption),
        format!("{:.2}", reading.daily_limit),
        yes_no(reading.over_limit).to_string(),
    ]
}

/// Justification lines for over-limit readings, newest last.
pub fn water_report_notes(readings: &[WaterReading]) -> Vec<String> {
    readings
        .iter()
        .filter(|r| r.over_limit)
        .map(|r| {
            let text = r
                .justification
                .as_deref()
                .unwrap_or("sem justificativa registrada");
            format!("{}: {}", r.reading_date.format("%d/%m/%Y"), text)
        })
        .collect()
}

/// Monthly water-consumption report for one school.
pub fn water_report(
    school: &School,
    year: i32,
    month: u32,
    readings: &[WaterReading],
) -> Result<Vec<u8>, ReportError> {
    let mut doc = configure_document("Relatório de consumo de água")?;
    push_heading(&mut doc, "Relatório de consumo de água");

    for line in water_report_header(school, year, month) {
        doc.push(Paragraph::new(line));
    }
    doc.push(Break::new(1));

    let mut table = TableLayout::new(vec![2, 2, 2, 2, 1]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for title in ["Data", "Leitura (m³)", "Consumo (m³)", "Limite (m³)", "Acima"] {
        header.push_element(Paragraph::new(title).styled(Style::new().bold()));
    }
    header.push().map_err(ReportError::Render)?;

    for reading in readings {
        let mut row = table.row();
        for cell in water_report_row(reading) {
            row.push_element(Paragraph::new(cell));
        }
        row.push().map_err(ReportError::Render)?;
    }
    doc.push(table);

    let notes = water_report_notes(readings);
    if !notes.is_empty() {
        doc.push(Break::new(1));
        doc.push(Paragraph::new("Justificativas").styled(Style::new().bold()));
        for note in notes {
            doc.push(Paragraph::new(note));
        }
    }

    render(doc)
}

/// Summary lines of the process report.
pub fn process_report_lines(process: &CustodianProcess, school_name: &str) -> Vec<String> {
    vec![
        format!("Processo SEI: {}", process.sei_number),
        format!("Escola: {}", school_name),
        format!(
            "Zelador(a): {}  CPF: {}  Função: {}",
            process.custodian_name, process.custodian_cpf, process.custodian_role
        ),
        format!(
            "Etapa atual: {} - {}",
            process.stage,
            stage_label(process.stage)
        ),
        format!("Isento de pagamento: {}", yes_no(process.exempt_from_payment)),
        format!("Arquivado: {}", yes_no(process.archived)),
    ]
}

/// One table row of the stage history.
pub fn stage_history_row(event: &ProcessStageEvent) -> [String; 3] {
    [
        event.stage.to_string(),
        stage_label(event.stage).to_string(),
        event.completed_at.format("%d/%m/%Y").to_string(),
    ]
}

/// Permit summary line, present once stage 6 was completed.
pub fn permit_line(permit: &PermitStatus) -> String {
    format!(
        "Permissão válida até {} ({} dias restantes) - {}",
        permit.expires_on.format("%d/%m/%Y"),
        permit.remaining_days,
        band_label(permit.band)
    )
}

/// Custodian-process summary report.
pub fn process_report(
    process: &CustodianProcess,
    school_name: &str,
    history: &[ProcessStageEvent],
    permit: Option<&PermitStatus>,
) -> Result<Vec<u8>, ReportError> {
    let mut doc = configure_document("Relatório de processo de zeladoria")?;
    push_heading(&mut doc, "Processo de zeladoria");

    for line in process_report_lines(process, school_name) {
        doc.push(Paragraph::new(line));
    }
    doc.push(Break::new(1));

    let mut table = TableLayout::new(vec![1, 4, 2]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for title in ["Etapa", "Descrição", "Concluída em"] {
        header.push_element(Paragraph::new(title).styled(Style::new().bold()));
    }
    header.push().map_err(ReportError::Render)?;

    for event in history {
        let mut row = table.row();
        for cell in stage_history_row(event) {
            row.push_element(Paragraph::new(cell));
        }
        row.push().map_err(ReportError::Render)?;
    }
    doc.push(table);

    if let Some(permit) = permit {
        doc.push(Break::new(1));
        doc.push(Paragraph::new(permit_line(permit)).styled(Style::new().bold()));
    }

    render(doc)
}

/// Header lines of the inspection report.
pub fn inspection_report_header(event: &InspectionEvent) -> Vec<String> {
    let mut lines = vec![format!(
        "Data de referência: {}",
        event.reference_date.format("%d/%m/%Y")
    )];
    if let Some(description) = &event.description {
        lines.push(description.clone());
    }
    lines
}

/// One table row of the inspection report.
pub fn inspection_report_row(row: &InspectionResponseWithSchool) -> [String; 3] {
    [
        row.school_name.clone(),
        yes_no(row.response.responded).to_string(),
        yes_no(row.response.notified).to_string(),
    ]
}

/// Fiscalization-campaign report: one row per school.
pub fn inspection_report(
    event: &InspectionEvent,
    responses: &[InspectionResponseWithSchool],
) -> Result<Vec<u8>, ReportError> {
    let mut doc = configure_document("Relatório de fiscalização")?;
    push_heading(&mut doc, "Campanha de fiscalização");

    for line in inspection_report_header(event) {
        doc.push(Paragraph::new(line));
    }
    doc.push(Break::new(1));

    let mut table = TableLayout::new(vec![4, 1, 1]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for title in ["Escola", "Respondeu", "Notificada"] {
        header.push_element(Paragraph::new(title).styled(Style::new().bold()));
    }
    header.push().map_err(ReportError::Render)?;

    for response in responses {
        let mut row = table.row();
        for cell in inspection_report_row(response) {
            row.push_element(Paragraph::new(cell));
        }
        row.push().map_err(ReportError::Render)?;
    }
    doc.push(table);

    render(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_reading(over: bool) -> WaterReading {
        WaterReading {
            id: 1,
            school_id: 1,
            reading_date: NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            meter_value: 520.0,
            population: 1000,
            consumption: 20.0,
            daily_limit: 8.0,
            over_limit: over,
            justification: over.then(|| "Vazamento identificado".to_string()),
            corrective_action: None,
            recorded_by: 1,
            created_at: NaiveDate::from_ymd_opt(2025, 3, 11)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_water_report_row_formats_figures() {
        let row = water_report_row(&sample_reading(true));
        assert_eq!(row[0], "11/03/2025");
        assert_eq!(row[1], "520.0");
        assert_eq!(row[2], "20.00");
        assert_eq!(row[3], "8.00");
        assert_eq!(row[4], "Sim");
    }

    #[test]
    fn test_water_report_notes_only_over_limit() {
        let readings = vec![sample_reading(false), sample_reading(true)];
        let notes = water_report_notes(&readings);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("Vazamento identificado"));
    }

    #[test]
    fn test_stage_labels_cover_workflow() {
        for stage in 1..=7 {
            assert_ne!(stage_label(stage), "Etapa desconhecida");
        }
        assert_eq!(stage_label(0), "Etapa desconhecida");
    }

    #[test]
    fn test_permit_line_mentions_band() {
        let permit = crate::permit::status(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
        );
        let line = permit_line(&permit);
        assert!(line.contains("01/01/2026"));
        assert!(line.contains("Permissão vencida"));
    }
}
