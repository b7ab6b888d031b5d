//! Menu state machine. Pure: no I/O, no access to the store.

use super::types::{ConversationState, QueueKey, Transition};

pub const WELCOME: &str = "👋 Hola, ¡Bienvenido a VICAR!\nPor favor, elija la sucursal de su preferencia:\n1. Asunción\n2. Ciudad del Este";
pub const MENU_BRANCH_A: &str = "Sucursal Asunción. Seleccioná una opción:\n1. Ventas Vehículos\n2. Post Venta\n3. Cobranzas\n4. Otros";
pub const MENU_BRANCH_B: &str = "Sucursal Ciudad del Este. Seleccioná una opción:\n1. Ventas Vehículos\n2. Post Venta\n3. Cobranzas\n4. Otros";
pub const INVALID_OPTION: &str = "⚠️ Opción inválida. Escriba 1 o 2.";
pub const POST_SALE_BRANCH_A: &str = "Post Venta Asunción. Elegí una opción:\n1. Ventas de repuestos\n2. Turno de Servicio\n3. Estado de vehículo";
pub const POST_SALE_BRANCH_B: &str = "Post Venta CDE. Elegí una opción:\n1. Ventas de repuestos\n2. Turno de Servicio\n3. Estado de vehículo";
pub const REQUEST_FORWARDED: &str = "✅ Solicitud enviada. Te derivamos al sector correspondiente.";
pub const FORWARDED_POST_SALE_A: &str = "✅ Solicitud enviada a Post Venta Asunción.";
pub const FORWARDED_POST_SALE_B: &str = "✅ Solicitud enviada a Post Venta CDE.";
pub const CLOSING: &str = "🙏 Gracias por comunicarte con VICAR. Si querés empezar de nuevo, escribí *Hola*.";

/// Advance `state` by one inbound message.
///
/// Only the literals `"1"` and `"2"` are menu choices; surrounding whitespace
/// is stripped, nothing else is normalised.
pub fn transition(state: ConversationState, inbound_text: &str) -> Transition {
    use ConversationState::*;

    let choice = inbound_text.trim();

    match state {
        Start => Transition::stay(BranchSelection, WELCOME),

        BranchSelection => match choice {
            "1" => Transition::stay(MenuBranchA, MENU_BRANCH_A),
            "2" => Transition::stay(MenuBranchB, MENU_BRANCH_B),
            _ => Transition::stay(BranchSelection, INVALID_OPTION),
        },

        MenuBranchA => match choice {
            "2" => Transition::stay(PostSaleBranchA, POST_SALE_BRANCH_A),
            _ => Transition::escalate(REQUEST_FORWARDED, QueueKey::BranchADefault),
        },

        PostSaleBranchA => Transition::escalate(FORWARDED_POST_SALE_A, QueueKey::BranchAPostSale),

        MenuBranchB => match choice {
            "2" => Transition::stay(PostSaleBranchB, POST_SALE_BRANCH_B),
            _ => Transition::escalate(REQUEST_FORWARDED, QueueKey::BranchBDefault),
        },

        PostSaleBranchB => Transition::escalate(FORWARDED_POST_SALE_B, QueueKey::BranchBPostSale),

        Done => Transition::stay(Start, CLOSING),
    }
}
