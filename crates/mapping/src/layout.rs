//! Declarative document layouts.
//!
//! A [`Layout`] lists the elements of one document variant in schema order.
//! Fields name the flat key they read; sections may be conditional on a
//! trigger field; repeated structures are [`GroupSpec`]s.

use std::sync::OnceLock;

use crate::group::{EntryShape, GroupPresence, GroupSpec, Inclusion, KeyForm};
use crate::variant::{DocumentVariant, SECURITY_CODE_FIELD};

/// A scalar element read from one flat key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub tag: &'static str,
    pub key: &'static str,
}

/// Whether a section is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Always built; pruned later if it ends up empty.
    Always,
    /// Built only when at least one of these fields is non-empty.
    WhenAny(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    pub tag: &'static str,
    pub presence: Presence,
    pub children: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Field(FieldSpec),
    Section(SectionSpec),
    Group(GroupSpec),
}

/// Element tree of one document variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub variant: DocumentVariant,
    pub elements: Vec<Element>,
}

impl Layout {
    /// Every group in the layout, outer groups before the groups nested in them.
    pub fn groups(&self) -> Vec<&GroupSpec> {
        let mut out = Vec::new();
        collect_groups(&self.elements, &mut out);
        out
    }

    pub fn group(&self, container: &str) -> Option<&GroupSpec> {
        self.groups().into_iter().find(|g| g.container == container)
    }
}

fn collect_groups<'a>(elements: &'a [Element], out: &mut Vec<&'a GroupSpec>) {
    for element in elements {
        match element {
            Element::Field(_) => {}
            Element::Section(section) => collect_groups(&section.children, out),
            Element::Group(group) => {
                out.push(group);
                if let EntryShape::Record(children) = &group.shape {
                    collect_groups(children, out);
                }
            }
        }
    }
}

pub fn full() -> &'static Layout {
    static FULL: OnceLock<Layout> = OnceLock::new();
    FULL.get_or_init(full_layout)
}

pub fn abbreviated() -> &'static Layout {
    static ABBREVIATED: OnceLock<Layout> = OnceLock::new();
    ABBREVIATED.get_or_init(abbreviated_layout)
}

// ── Builders ─────────────────────────────────────────────────────────────────

/// Field whose tag and key are the same.
pub fn field(tag: &'static str) -> Element {
    Element::Field(FieldSpec { tag, key: tag })
}

/// Field read from a key that differs from its tag.
pub fn field_from(tag: &'static str, key: &'static str) -> Element {
    Element::Field(FieldSpec { tag, key })
}

fn fields(tags: &[&'static str]) -> Vec<Element> {
    tags.iter().copied().map(field).collect()
}

fn section(tag: &'static str, children: Vec<Element>) -> Element {
    Element::Section(SectionSpec {
        tag,
        presence: Presence::Always,
        children,
    })
}

fn section_when(tag: &'static str, triggers: &[&'static str], children: Vec<Element>) -> Element {
    Element::Section(SectionSpec {
        tag,
        presence: Presence::WhenAny(triggers.to_vec()),
        children,
    })
}

fn group(
    container: &'static str,
    entry: &'static str,
    bound: u32,
    presence: GroupPresence,
    inclusion: Inclusion,
    shape: EntryShape,
) -> Element {
    Element::Group(GroupSpec {
        container,
        entry,
        bound,
        form: KeyForm::Bracketed,
        presence,
        inclusion,
        shape,
    })
}

// ── Shared groups ────────────────────────────────────────────────────────────

fn payment_methods() -> Element {
    group(
        "TablaFormasPago",
        "FormaDePago",
        3,
        GroupPresence::LeadEntry("FormaPago"),
        Inclusion::AnyField,
        EntryShape::Record(fields(&["FormaPago", "MontoPago"])),
    )
}

// ── Full document ────────────────────────────────────────────────────────────

fn full_layout() -> Layout {
    let id_doc = [
        vec![
            field("TipoeCF"),
            field_from("eNCF", "ENCF"),
        ],
        fields(&[
            "IndicadorNotaCredito",
            "FechaVencimientoSecuencia",
            "IndicadorEnvioDiferido",
            "IndicadorMontoGravado",
            "IndicadorServicioTodoIncluido",
            "TipoIngresos",
            "TipoPago",
            "FechaLimitePago",
            "TerminoPago",
        ]),
        vec![payment_methods()],
        fields(&[
            "TipoCuentaPago",
            "NumeroCuentaPago",
            "BancoPago",
            "FechaDesde",
            "FechaHasta",
            "TotalPaginas",
        ]),
    ]
    .concat();

    let issuer = [
        fields(&[
            "RNCEmisor",
            "RazonSocialEmisor",
            "NombreComercial",
            "Sucursal",
            "DireccionEmisor",
            "Municipio",
            "Provincia",
        ]),
        vec![group(
            "TablaTelefonoEmisor",
            "TelefonoEmisor",
            3,
            GroupPresence::LeadEntry("TelefonoEmisor"),
            Inclusion::AnyField,
            EntryShape::Value("TelefonoEmisor"),
        )],
        fields(&[
            "CorreoEmisor",
            "WebSite",
            "ActividadEconomica",
            "CodigoVendedor",
            "NumeroFacturaInterna",
            "NumeroPedidoInterno",
            "ZonaVenta",
            "RutaVenta",
            "InformacionAdicionalEmisor",
            "FechaEmision",
        ]),
    ]
    .concat();

    let buyer = fields(&[
        "RNCComprador",
        "IdentificadorExtranjero",
        "RazonSocialComprador",
        "ContactoComprador",
        "CorreoComprador",
        "DireccionComprador",
        "MunicipioComprador",
        "ProvinciaComprador",
        "FechaEntrega",
        "ContactoEntrega",
        "DireccionEntrega",
        "TelefonoAdicional",
        "FechaOrdenCompra",
        "NumeroOrdenCompra",
        "CodigoInternoComprador",
        "ResponsablePago",
        "InformacionAdicionalComprador",
    ]);

    // The source sheet spells the container number column with a trailing space.
    let additional_info = [
        fields(&["FechaEmbarque", "NumeroEmbarque"]),
        vec![field_from("NumeroContenedor", "NumeroContenedor ")],
        fields(&[
            "NumeroReferencia",
            "PesoBruto",
            "PesoNeto",
            "UnidadPesoBruto",
            "UnidadPesoNeto",
            "CantidadBulto",
            "UnidadBulto",
            "VolumenBulto",
            "UnidadVolumen",
        ]),
    ]
    .concat();

    let transport = fields(&[
        "Conductor",
        "DocumentoTransporte",
        "Ficha",
        "Placa",
        "RutaTransporte",
        "ZonaTransporte",
        "NumeroAlbaran",
    ]);

    let totals = [
        fields(&[
            "MontoGravadoTotal",
            "MontoGravadoI1",
            "MontoGravadoI2",
            "MontoGravadoI3",
            "MontoExento",
            "ITBIS1",
            "ITBIS2",
            "ITBIS3",
            "TotalITBIS",
            "TotalITBIS1",
            "TotalITBIS2",
            "TotalITBIS3",
            "MontoImpuestoAdicional",
        ]),
        vec![group(
            "ImpuestosAdicionales",
            "ImpuestoAdicional",
            20,
            GroupPresence::Always,
            Inclusion::AnyField,
            EntryShape::Record(fields(&[
                "TipoImpuesto",
                "TasaImpuestoAdicional",
                "MontoImpuestoSelectivoConsumoEspecifico",
                "MontoImpuestoSelectivoConsumoAdvalorem",
                "OtrosImpuestosAdicionales",
            ])),
        )],
        fields(&[
            "MontoTotal",
            "MontoNoFacturable",
            "MontoPeriodo",
            "SaldoAnterior",
            "MontoAvancePago",
            "ValorPagar",
            "TotalITBISRetenido",
            "TotalISRRetencion",
            "TotalITBISPercepcion",
            "TotalISRPercepcion",
        ]),
    ]
    .concat();

    let other_currency = [
        fields(&[
            "TipoMoneda",
            "TipoCambio",
            "MontoGravadoTotalOtraMoneda",
            "MontoGravado1OtraMoneda",
            "MontoGravado2OtraMoneda",
            "MontoGravado3OtraMoneda",
            "MontoExentoOtraMoneda",
            "TotalITBISOtraMoneda",
            "TotalITBIS1OtraMoneda",
            "TotalITBIS2OtraMoneda",
            "TotalITBIS3OtraMoneda",
            "MontoImpuestoAdicionalOtraMoneda",
        ]),
        vec![Element::Group(GroupSpec {
            container: "ImpuestosAdicionalesOtraMoneda",
            entry: "ImpuestoAdicionalOtraMoneda",
            bound: 3,
            form: KeyForm::Suffixed,
            presence: GroupPresence::LeadEntry("TipoImpuestoOtraMoneda"),
            inclusion: Inclusion::AllOf(vec!["TipoImpuestoOtraMoneda"]),
            shape: EntryShape::Record(fields(&[
                "TipoImpuestoOtraMoneda",
                "TasaImpuestoAdicionalOtraMoneda",
                "MontoImpuestoSelectivoConsumoEspecificoOtraMoneda",
                "MontoImpuestoSelectivoConsumoAdvaloremOtraMoneda",
                "OtrosImpuestosAdicionalesOtraMoneda",
            ])),
        })],
        fields(&["MontoTotalOtraMoneda"]),
    ]
    .concat();

    let header = vec![
        field("Version"),
        section("IdDoc", id_doc),
        section("Emisor", issuer),
        section("Comprador", buyer),
        section("InformacionesAdicionales", additional_info),
        section("Transporte", transport),
        section("Totales", totals),
        section_when("OtraMoneda", &["TipoMoneda"], other_currency),
    ];

    Layout {
        variant: DocumentVariant::Full,
        elements: vec![
            section("Encabezado", header),
            line_items(),
            subtotals(),
            adjustments(),
            pagination(),
            section(
                "InformacionReferencia",
                fields(&[
                    "NCFModificado",
                    "RNCOtroContribuyente",
                    "FechaNCFModificado",
                    "CodigoModificacion",
                    "RazonModificacion",
                ]),
            ),
            field("FechaHoraFirma"),
            field("any_element"),
        ],
    }
}

fn line_items() -> Element {
    let item = [
        fields(&["NumeroLinea"]),
        vec![group(
            "TablaCodigosItem",
            "CodigosItem",
            5,
            GroupPresence::Always,
            Inclusion::AllOf(vec!["TipoCodigo", "CodigoItem"]),
            EntryShape::Record(fields(&["TipoCodigo", "CodigoItem"])),
        )],
        fields(&["IndicadorFacturacion"]),
        vec![section(
            "Retencion",
            fields(&[
                "IndicadorAgenteRetencionoPercepcion",
                "MontoITBISRetenido",
                "MontoISRRetenido",
            ]),
        )],
        fields(&[
            "NombreItem",
            "IndicadorBienoServicio",
            "DescripcionItem",
            "CantidadItem",
            "UnidadMedida",
            "CantidadReferencia",
            "UnidadReferencia",
        ]),
        vec![group(
            "TablaSubcantidad",
            "SubcantidadItem",
            5,
            GroupPresence::LeadEntry("Subcantidad"),
            Inclusion::AnyField,
            EntryShape::Record(fields(&["Subcantidad", "CodigoSubcantidad"])),
        )],
        fields(&[
            "GradosAlcohol",
            "PrecioUnitarioReferencia",
            "FechaElaboracion",
            "FechaVencimientoItem",
            "PrecioUnitarioItem",
            "DescuentoMonto",
        ]),
        vec![group(
            "TablaSubDescuento",
            "SubDescuento",
            12,
            GroupPresence::LeadEntry("TipoSubDescuento"),
            Inclusion::AnyField,
            EntryShape::Record(fields(&[
                "TipoSubDescuento",
                "SubDescuentoPorcentaje",
                "MontoSubDescuento",
            ])),
        )],
        fields(&["RecargoMonto"]),
        vec![
            group(
                "TablaSubRecargo",
                "SubRecargo",
                12,
                GroupPresence::Always,
                Inclusion::Lead {
                    field: "TipoSubRecargo",
                    any_of: vec!["SubRecargoPorcentaje", "MontosubRecargo"],
                },
                EntryShape::Record(vec![
                    field("TipoSubRecargo"),
                    field("SubRecargoPorcentaje"),
                    field_from("MontoSubRecargo", "MontosubRecargo"),
                ]),
            ),
            group(
                "TablaImpuestoAdicional",
                "ImpuestoAdicional",
                2,
                GroupPresence::Always,
                Inclusion::AllOf(vec!["TipoImpuesto"]),
                EntryShape::Record(fields(&["TipoImpuesto"])),
            ),
            section_when(
                "OtraMonedaDetalle",
                &[
                    "PrecioOtraMoneda",
                    "DescuentoOtraMoneda",
                    "RecargoOtraMoneda",
                    "MontoItemOtraMoneda",
                ],
                fields(&[
                    "PrecioOtraMoneda",
                    "DescuentoOtraMoneda",
                    "RecargoOtraMoneda",
                    "MontoItemOtraMoneda",
                ]),
            ),
        ],
        fields(&["MontoItem"]),
    ]
    .concat();

    group(
        "DetallesItems",
        "Item",
        1000,
        GroupPresence::Always,
        Inclusion::AnyField,
        EntryShape::Record(item),
    )
}

fn subtotals() -> Element {
    group(
        "Subtotales",
        "Subtotal",
        20,
        GroupPresence::Always,
        Inclusion::AnyField,
        EntryShape::Record(fields(&[
            "NumeroSubTotal",
            "DescripcionSubtotal",
            "Orden",
            "SubTotalMontoGravadoTotal",
            "SubTotalMontoGravadoI1",
            "SubTotalMontoGravadoI2",
            "SubTotalMontoGravadoI3",
            "SubTotaITBIS",
            "SubTotaITBIS1",
            "SubTotaITBIS2",
            "SubTotaITBIS3",
            "SubTotalImpuestoAdicional",
            "SubTotalExento",
            "MontoSubTotal",
            "Lineas",
        ])),
    )
}

fn adjustments() -> Element {
    group(
        "DescuentosORecargos",
        "DescuentoORecargo",
        20,
        GroupPresence::Always,
        Inclusion::AnyField,
        EntryShape::Record(vec![
            field_from("NumeroLinea", "NumeroLineaDoR"),
            field("TipoAjuste"),
            field("IndicadorNorma1007"),
            field("DescripcionDescuentooRecargo"),
            field("TipoValor"),
            field("ValorDescuentooRecargo"),
            field("MontoDescuentooRecargo"),
            field("MontoDescuentooRecargoOtraMoneda"),
            field("IndicadorFacturacionDescuentooRecargo"),
        ]),
    )
}

fn pagination() -> Element {
    let page = [
        fields(&[
            "PaginaNo",
            "NoLineaDesde",
            "NoLineaHasta",
            "SubtotalMontoGravadoPagina",
            "SubtotalMontoGravado1Pagina",
            "SubtotalMontoGravado2Pagina",
            "SubtotalMontoGravado3Pagina",
            "SubtotalExentoPagina",
            "SubtotalItbisPagina",
            "SubtotalItbis1Pagina",
            "SubtotalItbis2Pagina",
            "SubtotalItbis3Pagina",
            "SubtotalImpuestoAdicionalPagina",
        ]),
        vec![section_when(
            "SubtotalImpuestoAdicional",
            &[
                "SubtotalImpuestoSelectivoConsumoEspecificoPagina",
                "SubtotalOtrosImpuesto",
            ],
            fields(&[
                "SubtotalImpuestoSelectivoConsumoEspecificoPagina",
                "SubtotalOtrosImpuesto",
            ]),
        )],
        fields(&["MontoSubtotalPagina", "SubtotalMontoNoFacturablePagina"]),
    ]
    .concat();

    group(
        "Paginacion",
        "Pagina",
        1000,
        GroupPresence::Always,
        Inclusion::AnyField,
        EntryShape::Record(page),
    )
}

// ── Abbreviated document ─────────────────────────────────────────────────────

fn abbreviated_layout() -> Layout {
    let header = vec![
        field("Version"),
        section(
            "IdDoc",
            vec![
                field("TipoeCF"),
                field_from("eNCF", "ENCF"),
                field("TipoIngresos"),
                field("TipoPago"),
                payment_methods(),
            ],
        ),
        section(
            "Emisor",
            fields(&["RNCEmisor", "RazonSocialEmisor", "FechaEmision"]),
        ),
        section(
            "Comprador",
            fields(&[
                "RNCComprador",
                "IdentificadorExtranjero",
                "RazonSocialComprador",
            ]),
        ),
        section(
            "Totales",
            fields(&[
                "MontoGravadoTotal",
                "MontoGravadoI1",
                "MontoGravadoI2",
                "MontoGravadoI3",
                "MontoExento",
                "TotalITBIS",
                "TotalITBIS1",
                "TotalITBIS2",
                "TotalITBIS3",
                "MontoImpuestoAdicional",
                "MontoTotal",
                "MontoNoFacturable",
                "MontoPeriodo",
            ]),
        ),
        field(SECURITY_CODE_FIELD),
    ];

    Layout {
        variant: DocumentVariant::Abbreviated,
        elements: vec![section("Encabezado", header)],
    }
}
