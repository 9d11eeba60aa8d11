mod app;
mod risk_panel;

pub use app::GuiApp;
pub use risk_panel::RiskPanel;
