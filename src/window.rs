//! X11 panel window: 32-bit ARGB visual for transparency, override-redirect
//! so it floats without WM decoration, and the SHAPE extension to cut its
//! input and bounding region down to the opaque part of the theme.

use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::shape::{self, ConnectionExt as _, SK, SO};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use log::{debug, warn};

use panel_theme::byte_order::ByteOrder;
use panel_theme::geometry::Rect;
use panel_theme::surface::Surface;

pub struct PanelWindow {
    conn: RustConnection,
    window: Window,
    gc: Gcontext,
    byte_order: ByteOrder,
    has_shape: bool,
    blur_atom: Atom,
    visible: bool,
    width: u16,
    height: u16,
}

impl PanelWindow {
    pub fn new(x: i16, y: i16, width: u16, height: u16) -> Result<Self, String> {
        let (conn, screen_num) = RustConnection::connect(None).map_err(|e| format!("X11 connect: {e}"))?;
        let screen = &conn.setup().roots[screen_num];

        let byte_order = if conn.setup().image_byte_order == ImageOrder::LSB_FIRST {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };

        let (visual, depth) = find_argb_visual(screen).unwrap_or((screen.root_visual, screen.root_depth));

        let colormap = conn.generate_id().map_err(|e| e.to_string())?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, screen.root, visual)
            .map_err(|e| e.to_string())?;

        let window = conn.generate_id().map_err(|e| e.to_string())?;
        let values = CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(0)
            .border_pixel(0)
            .colormap(colormap)
            .event_mask(EventMask::EXPOSURE | EventMask::STRUCTURE_NOTIFY);

        conn.create_window(depth, window, screen.root, x, y, width, height, 0, WindowClass::INPUT_OUTPUT, visual, &values)
            .map_err(|e| format!("create_window: {e}"))?;

        let atom_type = intern_atom(&conn, "_NET_WM_WINDOW_TYPE")?;
        let atom_popup = intern_atom(&conn, "_NET_WM_WINDOW_TYPE_POPUP_MENU")?;
        conn.change_property32(PropMode::REPLACE, window, atom_type, AtomEnum::ATOM, &[atom_popup])
            .map_err(|e| e.to_string())?;

        conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_NAME, AtomEnum::STRING, b"panel-theme")
            .map_err(|e| e.to_string())?;

        let blur_atom = intern_atom(&conn, "_KDE_NET_WM_BLUR_BEHIND_REGION")?;

        let has_shape = conn
            .extension_information(shape::X11_EXTENSION_NAME)
            .map_err(|e| e.to_string())?
            .is_some();
        if !has_shape {
            warn!("X server has no SHAPE extension, window stays rectangular");
        }

        let gc = conn.generate_id().map_err(|e| e.to_string())?;
        conn.create_gc(gc, window, &CreateGCAux::new()).map_err(|e| e.to_string())?;
        conn.flush().map_err(|e| e.to_string())?;

        debug!("Window created: {width}x{height} at ({x},{y}), depth {depth}, {byte_order:?} images");

        Ok(PanelWindow {
            conn, window, gc, byte_order, has_shape, blur_atom, visible: false,
            width, height,
        })
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn show(&mut self) {
        if !self.visible {
            let _ = self.conn.map_window(self.window);
            let _ = self.conn.flush();
            self.visible = true;
        }
    }

    /// Upload a premultiplied surface in the server's image byte order.
    pub fn update_pixels(&self, surface: &Surface) {
        let data = surface.to_argb32_bytes(self.byte_order);
        let (width, height) = (surface.width() as u16, surface.height() as u16);
        let _ = self.conn.put_image(ImageFormat::Z_PIXMAP, self.window, self.gc, width, height, 0, 0, 0, 32, &data);
        let _ = self.conn.flush();
    }

    /// Restrict both the visible and the input area to `rects`.
    pub fn set_shape(&self, rects: &[Rect]) {
        if !self.has_shape {
            return;
        }
        let rectangles: Vec<Rectangle> = rects.iter().map(to_x_rect).collect();
        for kind in [SK::BOUNDING, SK::INPUT] {
            if let Err(e) = self.conn.shape_rectangles(
                SO::SET,
                kind,
                ClipOrdering::YX_BANDED,
                self.window,
                0,
                0,
                &rectangles,
            ) {
                warn!("shape_rectangles: {e}");
            }
        }
        let _ = self.conn.flush();
        debug!("Window shape set from {} rects", rects.len());
    }

    /// Ask a KDE-compatible compositor to blur behind `rects`; an empty list
    /// turns blurring off.
    pub fn set_blur_region(&self, rects: &[Rect]) {
        let result = if rects.is_empty() {
            self.conn.delete_property(self.window, self.blur_atom).map(|_| ())
        } else {
            let data: Vec<u32> = rects
                .iter()
                .flat_map(|r| [r.x as u32, r.y as u32, r.width as u32, r.height as u32])
                .collect();
            self.conn
                .change_property32(PropMode::REPLACE, self.window, self.blur_atom, AtomEnum::CARDINAL, &data)
                .map(|_| ())
        };
        if let Err(e) = result {
            warn!("blur region: {e}");
        }
        let _ = self.conn.flush();
    }

    pub fn poll_events(&self) {
        while let Ok(Some(event)) = self.conn.poll_for_event() {
            match event {
                Event::Expose(_) => debug!("Expose event"),
                _ => {}
            }
        }
    }
}

fn to_x_rect(r: &Rect) -> Rectangle {
    Rectangle {
        x: r.x as i16,
        y: r.y as i16,
        width: r.width as u16,
        height: r.height as u16,
    }
}

fn find_argb_visual(screen: &Screen) -> Option<(Visualid, u8)> {
    for depth_info in &screen.allowed_depths {
        if depth_info.depth == 32 {
            for visual in &depth_info.visuals {
                if visual.class == VisualClass::TRUE_COLOR {
                    return Some((visual.visual_id, 32));
                }
            }
        }
    }
    None
}

fn intern_atom(conn: &RustConnection, name: &str) -> Result<Atom, String> {
    conn.intern_atom(false, name.as_bytes())
        .map_err(|e| e.to_string())?
        .reply()
        .map(|r| r.atom)
        .map_err(|e| e.to_string())
}
