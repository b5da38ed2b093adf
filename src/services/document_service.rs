// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Alignment, Element};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::User,
        transactions::{OrderDetail, SaleDetail, TransactionLine},
    },
    services::transaction_service::TransactionService,
};

// Família esperada em FONTS_DIR (Roboto-Regular.ttf, Roboto-Bold.ttf, ...)
const FONT_FAMILY: &str = "Roboto";

// O que o comprovante imprime, igual para venda e pedido
struct Receipt<'a> {
    title: String,
    date: String,
    client: String,
    salesperson: &'a str,
    status: String,
    delivery: Option<String>,
    lines: &'a [TransactionLine],
    total: rust_decimal::Decimal,
    notes: &'a str,
}

#[derive(Clone)]
pub struct DocumentService {
    transaction_service: TransactionService,
    fonts_dir: PathBuf,
}

impl DocumentService {
    pub fn new(transaction_service: TransactionService, fonts_dir: impl Into<PathBuf>) -> Self {
        Self { transaction_service, fonts_dir: fonts_dir.into() }
    }

    pub async fn sale_receipt(&self, user: &User, sale_id: Uuid) -> Result<Vec<u8>, AppError> {
        let SaleDetail { sale, lines } = self.transaction_service.get_sale(user, sale_id).await?;

        let short_id = sale.id.simple().to_string();
        let receipt = Receipt {
            title: format!("COMPROBANTE DE VENTA #{}", &short_id[..8]),
            date: sale.created_at.format("%d/%m/%Y %H:%M").to_string(),
            client: format!("{} (NIT {})", sale.client_name, sale.client_nit),
            salesperson: &sale.salesperson_name,
            status: status_label(&sale.status),
            delivery: None,
            lines: &lines,
            total: sale.total,
            notes: &sale.notes,
        };

        let pdf = self.render(&receipt)?;
        tracing::info!("Comprovante da venda {} gerado ({} bytes)", sale.id, pdf.len());
        Ok(pdf)
    }

    pub async fn order_receipt(&self, user: &User, order_id: Uuid) -> Result<Vec<u8>, AppError> {
        let OrderDetail { order, lines } = self.transaction_service.get_order(user, order_id).await?;

        let short_id = order.id.simple().to_string();
        let receipt = Receipt {
            title: format!("PEDIDO #{}", &short_id[..8]),
            date: order.created_at.format("%d/%m/%Y %H:%M").to_string(),
            client: format!("{} (NIT {})", order.client_name, order.client_nit),
            salesperson: &order.salesperson_name,
            status: status_label(&order.status),
            delivery: order.estimated_delivery.map(|d| d.format("%d/%m/%Y").to_string()),
            lines: &lines,
            total: order.total,
            notes: &order.notes,
        };

        let pdf = self.render(&receipt)?;
        tracing::info!("Comprovante do pedido {} gerado ({} bytes)", order.id, pdf.len());
        Ok(pdf)
    }

    fn render(&self, receipt: &Receipt<'_>) -> Result<Vec<u8>, AppError> {
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None)
            .map_err(|_| AppError::FontNotFound(format!("{} em {}", FONT_FAMILY, self.fonts_dir.display())))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(receipt.title.clone());
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(elements::Paragraph::new(receipt.title.clone()).styled(style::Style::new().bold().with_font_size(16)));
        doc.push(elements::Paragraph::new(format!("Fecha: {}", receipt.date)));
        doc.push(elements::Paragraph::new(format!("Cliente: {}", receipt.client)));
        doc.push(elements::Paragraph::new(format!("Vendedor: {}", receipt.salesperson)));
        doc.push(elements::Paragraph::new(format!("Estado: {}", receipt.status)));
        if let Some(delivery) = &receipt.delivery {
            doc.push(elements::Paragraph::new(format!("Entrega estimada: {}", delivery)));
        }
        doc.push(elements::Break::new(1.5));

        // --- LINHAS ---
        // Pesos: produto (4), quantidade (1), unitário (2), subtotal (2)
        let mut table = elements::TableLayout::new(vec![4, 1, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Producto").styled(bold))
            .element(elements::Paragraph::new("Cant.").styled(bold))
            .element(elements::Paragraph::new("Precio").styled(bold))
            .element(elements::Paragraph::new("Subtotal").styled(bold))
            .push()
            .map_err(|e| anyhow::anyhow!("Falha ao montar a tabela: {}", e))?;

        for line in receipt.lines {
            table
                .row()
                .element(elements::Paragraph::new(line.product_name.clone()))
                .element(elements::Paragraph::new(format!("{:.2}", line.quantity)))
                .element(elements::Paragraph::new(format!("Q {:.2}", line.unit_price)))
                .element(elements::Paragraph::new(format!("Q {:.2}", line.subtotal)))
                .push()
                .map_err(|e| anyhow::anyhow!("Falha ao montar a linha: {}", e))?;
        }

        doc.push(table);
        doc.push(elements::Break::new(1));

        // --- TOTAL ---
        let mut total = elements::Paragraph::new(format!("TOTAL: Q {:.2}", receipt.total));
        total.set_alignment(Alignment::Right);
        doc.push(total.styled(style::Style::new().bold().with_font_size(12)));

        if !receipt.notes.trim().is_empty() {
            doc.push(elements::Break::new(1.5));
            doc.push(elements::Paragraph::new(receipt.notes.to_string()).styled(style::Style::new().italic().with_font_size(9)));
        }

        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;
        Ok(buffer)
    }
}

// Mesmo texto usado na API ("completada", "entregado", ...)
fn status_label<T: serde::Serialize>(status: &T) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transactions::{OrderStatus, SaleStatus};

    #[test]
    fn status_label_uses_wire_names() {
        assert_eq!(status_label(&SaleStatus::Completed), "completada");
        assert_eq!(status_label(&OrderStatus::Delivered), "entregado");
    }
}
