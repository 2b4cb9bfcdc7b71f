use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;

use crate::image_io::encode_png;
use crate::quantize::QuantizeOptions;
use crate::session::Session;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Browser-facing handle on a [`Session`].
///
/// ```js
/// const session = new ReducerSession(bytes, 8);
/// session.setOverride(session.clusterForHex("#1f3a5c"), "#ff0000");
/// img.src = URL.createObjectURL(new Blob([session.previewPng()]));
/// const pdf = session.exportPdf("A4");
/// ```
#[wasm_bindgen]
pub struct ReducerSession {
    inner: Session,
}

#[wasm_bindgen]
impl ReducerSession {
    /// Decode the uploaded file and quantize it to `n_colors`.
    #[wasm_bindgen(constructor)]
    pub fn new(input: Vec<u8>, n_colors: usize) -> Result<ReducerSession, JsValue> {
        let mut inner = Session::new(QuantizeOptions::default());
        inner.load(&input, n_colors).map_err(js_err)?;
        Ok(ReducerSession { inner })
    }

    #[wasm_bindgen(js_name = nColors)]
    pub fn n_colors(&self) -> usize {
        self.inner.n_colors()
    }

    /// Re-quantize with a different palette size. Clears all overrides.
    #[wasm_bindgen(js_name = setColorCount)]
    pub fn set_color_count(&mut self, n_colors: usize) -> Result<(), JsValue> {
        self.inner.quantize(n_colors).map_err(js_err)
    }

    #[wasm_bindgen(js_name = setOverride)]
    pub fn set_override(&mut self, cluster: usize, hex: &str) -> Result<(), JsValue> {
        self.inner.set_override_hex(cluster, hex).map_err(js_err)
    }

    #[wasm_bindgen(js_name = clearOverride)]
    pub fn clear_override(&mut self, cluster: usize) -> Result<(), JsValue> {
        self.inner.clear_override(cluster).map_err(js_err)
    }

    #[wasm_bindgen(js_name = clearOverrides)]
    pub fn clear_overrides(&mut self) {
        self.inner.clear_overrides();
    }

    #[wasm_bindgen(js_name = clusterForHex)]
    pub fn cluster_for_hex(&self, hex: &str) -> Result<usize, JsValue> {
        self.inner.cluster_for_hex(hex).map_err(js_err)
    }

    /// PNG bytes of the reduced image with overrides applied.
    #[wasm_bindgen(js_name = previewPng)]
    pub fn preview_png(&self) -> Result<Uint8Array, JsValue> {
        let img = self
            .inner
            .render_image()
            .ok_or_else(|| JsValue::from_str("No image has been quantized yet"))?;
        let encoded = encode_png(&img).map_err(|e| js_err(format!("PNG encode error: {e}")))?;
        Ok(Uint8Array::from(encoded.as_slice()))
    }

    /// `[{cluster, hex, percentage}, ...]`, most-used first.
    pub fn palette(&self) -> Result<Array, JsValue> {
        let out = Array::new();
        for entry in self.inner.palette() {
            let row = Object::new();
            Reflect::set(&row, &JsValue::from_str("cluster"), &JsValue::from(entry.cluster as u32))?;
            Reflect::set(&row, &JsValue::from_str("hex"), &JsValue::from_str(&entry.hex()))?;
            Reflect::set(
                &row,
                &JsValue::from_str("percentage"),
                &JsValue::from_f64(entry.percentage()),
            )?;
            out.push(&row);
        }
        Ok(out)
    }

    /// One-page PDF of the reduced image and its palette.
    #[wasm_bindgen(js_name = exportPdf)]
    pub fn export_pdf(&self, page_size: &str) -> Result<Uint8Array, JsValue> {
        let bytes = self.inner.export_pdf(page_size).map_err(js_err)?;
        Ok(Uint8Array::from(bytes.as_slice()))
    }
}
