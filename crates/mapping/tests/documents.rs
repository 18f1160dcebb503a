//! End-to-end mapping of realistic scenario records.
#![recursion_limit = "256"]

use ecf_mapping::{
    build_abbreviated, build_full, map_scenario, normalize, requires_abbreviated, DocumentVariant,
    MappingError, Node, Scalar, SecurityCode, StandardSanitizer,
};
use serde_json::json;

fn scenario(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().expect("scenario must be an object")
}

fn credit_invoice() -> serde_json::Map<String, serde_json::Value> {
    scenario(json!({
        "EmpresaID": "emp-01",
        "estatus": "pendiente",
        "CasoPrueba": "131880681E310000000001",
        "Version": "1.0",
        "TipoeCF": "31",
        "ENCF": "E310000000001",
        "FechaVencimientoSecuencia": "31-12-2025",
        "IndicadorMontoGravado": "0",
        "TipoIngresos": "01",
        "TipoPago": "2",
        "FechaLimitePago": "15-01-2025",
        "FormaPago[1]": "1",
        "MontoPago[1]": "5900.00",
        "FormaPago[2]": "",
        "MontoPago[2]": "",
        "RNCEmisor": 131880681,
        "RazonSocialEmisor": "DOCUMENTOS ELECTRONICOS DE 02",
        "DireccionEmisor": "AVE. ISABEL AGUIAR NO. 269",
        "TelefonoEmisor[1]": "809-472-7676",
        "TelefonoEmisor[2]": "809-491-1918",
        "FechaEmision": "01-04-2020",
        "RNCComprador": "131880738",
        "RazonSocialComprador": "EMPRESA COMPRADORA",
        "MontoGravadoTotal": "5000.00",
        "MontoGravadoI1": "5000.00",
        "ITBIS1": "18",
        "TotalITBIS": "900.00",
        "TotalITBIS1": "900.00",
        "MontoTotal": "5900.00",
        "NumeroLinea[1]": "1",
        "IndicadorFacturacion[1]": "1",
        "NombreItem[1]": "Servicio de consultoria",
        "IndicadorBienoServicio[1]": "2",
        "CantidadItem[1]": "1.00",
        "PrecioUnitarioItem[1]": "3000.00",
        "MontoItem[1]": "3000.00",
        "TipoCodigo[1][1]": "EAN",
        "CodigoItem[1][1]": "7501031311309",
        "NumeroLinea[2]": "2",
        "IndicadorFacturacion[2]": "1",
        "NombreItem[2]": "Licencia anual",
        "IndicadorBienoServicio[2]": "2",
        "CantidadItem[2]": "1.00",
        "PrecioUnitarioItem[2]": "2000.00",
        "DescuentoMonto[2]": "0.00",
        "TipoSubDescuento[2][1]": "$",
        "MontoSubDescuento[2][1]": "0.00",
        "MontoItem[2]": "2000.00",
        "PaginaNo[1]": "1",
        "NoLineaDesde[1]": "1",
        "NoLineaHasta[1]": "2",
        "MontoSubtotalPagina[1]": "5900.00",
        "NCFModificado": "",
    }))
}

fn walk(node: &Node, path: &mut Vec<String>, out: &mut Vec<String>) {
    match node {
        Node::Absent => out.push(format!("absent at {}", path.join("/"))),
        Node::Scalar(s) if s.is_empty() => out.push(format!("blank at {}", path.join("/"))),
        Node::Scalar(_) => {}
        Node::List(items) if items.is_empty() => out.push(format!("empty list at {}", path.join("/"))),
        Node::List(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                walk(item, path, out);
                path.pop();
            }
        }
        Node::Section(s) if s.is_empty() => out.push(format!("empty section at {}", path.join("/"))),
        Node::Section(s) => {
            for (tag, child) in s.entries() {
                path.push(tag.to_string());
                walk(child, path, out);
                path.pop();
            }
        }
    }
}

#[test]
fn full_invoice_maps_to_the_expected_tree() {
    let (record, document) = map_scenario(&credit_invoice(), &StandardSanitizer).unwrap();

    assert!(record.get("EmpresaID").is_none());
    assert!(record.get("estatus").is_none());
    assert!(!requires_abbreviated(&record));

    let rendered = serde_json::to_value(&document).unwrap();
    let header = &rendered["ECF"]["Encabezado"];
    assert_eq!(header["IdDoc"]["eNCF"], json!("E310000000001"));
    assert_eq!(
        header["IdDoc"]["TablaFormasPago"]["FormaDePago"],
        json!([{ "FormaPago": "1", "MontoPago": "5900.00" }])
    );
    assert_eq!(
        header["Emisor"]["TablaTelefonoEmisor"]["TelefonoEmisor"],
        json!(["809-472-7676", "809-491-1918"])
    );
    assert_eq!(header["Emisor"]["RNCEmisor"], json!(131880681));
    assert!(header.get("OtraMoneda").is_none());
    assert!(header.get("Transporte").is_none());

    let items = rendered["ECF"]["DetallesItems"]["Item"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0]["TablaCodigosItem"]["CodigosItem"],
        json!([{ "TipoCodigo": "EAN", "CodigoItem": "7501031311309" }])
    );
    assert_eq!(
        items[1]["TablaSubDescuento"]["SubDescuento"],
        json!([{ "TipoSubDescuento": "$", "MontoSubDescuento": "0.00" }])
    );
    assert!(items[0].get("Retencion").is_none());

    assert_eq!(
        rendered["ECF"]["Paginacion"]["Pagina"][0]["MontoSubtotalPagina"],
        json!("5900.00")
    );
    assert!(rendered["ECF"].get("InformacionReferencia").is_none());
    assert!(rendered["ECF"].get("Subtotales").is_none());
}

#[test]
fn full_invoice_holds_no_empty_structure() {
    let (_, document) = map_scenario(&credit_invoice(), &StandardSanitizer).unwrap();
    let mut problems = Vec::new();
    walk(&Node::Section(document.root), &mut Vec::new(), &mut problems);
    assert!(problems.is_empty(), "{:?}", problems);
}

#[test]
fn item_keys_are_emitted_in_schema_order() {
    let (_, document) = map_scenario(&credit_invoice(), &StandardSanitizer).unwrap();
    let item = document
        .at(&["DetallesItems", "Item"])
        .and_then(Node::as_list)
        .and_then(|items| items.first())
        .and_then(Node::as_section)
        .unwrap();
    let tags: Vec<&str> = item.entries().map(|(t, _)| t).collect();
    assert_eq!(
        tags,
        vec![
            "NumeroLinea",
            "TablaCodigosItem",
            "IndicadorFacturacion",
            "NombreItem",
            "IndicadorBienoServicio",
            "CantidadItem",
            "PrecioUnitarioItem",
            "MontoItem",
        ]
    );
}

#[test]
fn consumer_invoice_produces_both_variants() {
    let mut raw = credit_invoice();
    raw.insert("TipoeCF".into(), json!("32"));
    raw.insert("ENCF".into(), json!("E320000000001"));
    let record = normalize(&raw, &StandardSanitizer).unwrap();
    assert!(requires_abbreviated(&record));

    let full = build_full(&record).unwrap();
    let code = SecurityCode::from_signature_value("k9Lr2QxPzA0bYc==").unwrap();
    let summary = build_abbreviated(&record, &code).unwrap();

    assert_eq!(full.variant, DocumentVariant::Full);
    let rendered = serde_json::to_value(&summary).unwrap();
    let header = &rendered["RFCE"]["Encabezado"];
    assert_eq!(header["CodigoSeguridadeCF"], json!("k9Lr2Q"));
    assert_eq!(header["IdDoc"]["eNCF"], json!("E320000000001"));
    assert_eq!(
        header["IdDoc"]["TablaFormasPago"]["FormaDePago"],
        json!([{ "FormaPago": "1", "MontoPago": "5900.00" }])
    );
    assert!(header["Emisor"].get("DireccionEmisor").is_none());
    assert!(header["Totales"].get("ITBIS1").is_none());
    assert!(rendered["RFCE"].get("DetallesItems").is_none());

    // The record itself is untouched by the security-code injection.
    assert!(record.get("CodigoSeguridadeCF").is_none());
}

#[test]
fn empty_scenario_is_rejected_before_anything_else() {
    let raw = scenario(json!({ "EmpresaID": "emp-01", "estatus": "x", "Version": "  " }));
    let err = map_scenario(&raw, &StandardSanitizer).unwrap_err();
    assert_eq!(
        err,
        MappingError::EmptyDocument {
            variant: DocumentVariant::Full
        }
    );
}

#[test]
fn nested_sections_follow_their_triggers() {
    let raw = scenario(json!({
        "NumeroLinea[1]": "1",
        "MontoItem[1]": "100.00",
        "MontoITBISRetenido[1]": "18.00",
        "MontoItemOtraMoneda[1]": "1.70",
        "PaginaNo[1]": "1",
        "SubtotalOtrosImpuesto[1]": "5.00",
    }));
    let (_, document) = map_scenario(&raw, &StandardSanitizer).unwrap();
    let item = document
        .at(&["DetallesItems", "Item"])
        .and_then(Node::as_list)
        .and_then(|items| items.first())
        .unwrap();
    assert_eq!(
        item.at(&["Retencion", "MontoITBISRetenido"]).and_then(Node::as_scalar),
        Some(&Scalar::text("18.00"))
    );
    assert_eq!(
        item.at(&["OtraMonedaDetalle", "MontoItemOtraMoneda"]).and_then(Node::as_scalar),
        Some(&Scalar::text("1.70"))
    );
    let page = document
        .at(&["Paginacion", "Pagina"])
        .and_then(Node::as_list)
        .and_then(|pages| pages.first())
        .unwrap();
    assert!(page
        .at(&["SubtotalImpuestoAdicional", "SubtotalOtrosImpuesto"])
        .is_some());
}
