//! Owned premultiplied pixel surfaces and the decoders that produce them.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;
use tiny_skia::{BlendMode, IntSize, Paint, Pixmap, PremultipliedColorU8, Shader, Transform};

use crate::byte_order::{mul_div_255, ByteOrder};
use crate::config::{Color, Margin};
use crate::error::{Result, ThemeError};

/// Smallest stretchable area of a procedurally drawn background.
const MIN_FALLBACK_SIZE: i32 = 20;

/// Premultiplied RGBA pixel buffer.
#[derive(Clone, PartialEq)]
pub struct Surface {
    pixmap: Pixmap,
    has_alpha: bool,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("has_alpha", &self.has_alpha)
            .finish()
    }
}

impl Surface {
    /// Fully transparent surface. Zero dimensions are bumped to one pixel.
    pub fn transparent(width: u32, height: u32) -> Self {
        let pixmap = Pixmap::new(width.max(1), height.max(1))
            .unwrap_or_else(|| Pixmap::new(1, 1).expect("1x1 pixmap"));
        Surface { pixmap, has_alpha: true }
    }

    pub fn from_pixmap(pixmap: Pixmap, has_alpha: bool) -> Self {
        Surface { pixmap, has_alpha }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.pixmap.width() as usize * 4
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Premultiplied RGBA bytes, `stride()` bytes per row.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PremultipliedColorU8> {
        self.pixmap.pixel(x, y)
    }

    /// Build a surface from straight-alpha rows of 1 to 4 channels
    /// (gray, gray+alpha, RGB, RGBA). Channels are premultiplied on the way in;
    /// inputs without alpha come out fully opaque.
    pub fn from_rows(width: u32, height: u32, channels: usize, stride: usize, src: &[u8]) -> Result<Self> {
        let invalid = ThemeError::InvalidSize { width, height };
        let size = IntSize::from_wh(width, height).ok_or(invalid)?;
        let row_len = width as usize * channels;
        if !(1..=4).contains(&channels)
            || stride < row_len
            || src.len() < stride * (height as usize - 1) + row_len
        {
            return Err(ThemeError::InvalidSize { width, height });
        }

        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for row in src.chunks(stride).take(height as usize) {
            for px in row[..row_len].chunks_exact(channels) {
                let (r, g, b, a) = match channels {
                    1 => (px[0], px[0], px[0], 0xFF),
                    2 => (px[0], px[0], px[0], px[1]),
                    3 => (px[0], px[1], px[2], 0xFF),
                    _ => (px[0], px[1], px[2], px[3]),
                };
                if a == 0xFF {
                    data.extend_from_slice(&[r, g, b, a]);
                } else {
                    data.extend_from_slice(&[
                        mul_div_255(r, a),
                        mul_div_255(g, a),
                        mul_div_255(b, a),
                        a,
                    ]);
                }
            }
        }

        let pixmap = Pixmap::from_vec(data, size).ok_or(ThemeError::InvalidSize { width, height })?;
        Ok(Surface { pixmap, has_alpha: channels == 2 || channels == 4 })
    }

    /// Decode an image file at its natural size.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_size(path, None)
    }

    /// Decode an image file. Vector images are rasterized to fit a square of
    /// `size` pixels when given; raster images keep their own size.
    ///
    /// PNG streams from disk. Other raster formats the `image` crate knows
    /// (JPEG, GIF, WebP, BMP) are read whole and decoded in memory.
    pub fn load_with_size(path: &Path, size: Option<u32>) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let surface = match ext.as_deref() {
            Some("png") => decode_png(BufReader::new(File::open(path)?))?,
            Some("svg") => decode_svg(&std::fs::read(path)?, size)?,
            _ => {
                let data = std::fs::read(path)?;
                if image::guess_format(&data).is_err() {
                    return Err(ThemeError::UnsupportedFormat(path.to_path_buf()));
                }
                decode_raster(&data)?
            }
        };
        debug!("decoded {} ({}x{})", path.display(), surface.width(), surface.height());
        Ok(surface)
    }

    /// Procedural stand-in for a background image that could not be loaded:
    /// a border-colored frame of `border_width` filled with `color`, sized so
    /// every margin has room plus a stretchable middle.
    pub fn solid_background(margin: &Margin, border_width: i32, border_color: Color, color: Color) -> Self {
        let horizontal = margin.left + margin.right;
        let vertical = margin.top + margin.bottom;
        let width = horizontal + horizontal.max(MIN_FALLBACK_SIZE);
        let height = vertical + vertical.max(MIN_FALLBACK_SIZE);
        let border = border_width
            .min(margin.left)
            .min(margin.right)
            .min(margin.top)
            .min(margin.bottom)
            .max(0);
        debug!("paint fallback background: {width}x{height}, border {border}");

        let mut surface = Surface::transparent(width as u32, height as u32);
        let pixmap = surface.pixmap_mut();
        if border > 0 {
            pixmap.fill(border_color.to_skia());
        }
        let inner = tiny_skia::Rect::from_xywh(
            border as f32,
            border as f32,
            (width - border * 2) as f32,
            (height - border * 2) as f32,
        );
        if let Some(inner) = inner {
            let paint = Paint {
                shader: Shader::SolidColor(color.to_skia()),
                blend_mode: BlendMode::Source,
                anti_alias: false,
                ..Paint::default()
            };
            pixmap.fill_rect(inner, &paint, Transform::identity(), None);
        }
        surface
    }

    /// Export as 32-bit ARGB words laid out for a consumer with `order`.
    pub fn to_argb32_bytes(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data().len());
        for px in self.pixmap.pixels() {
            out.extend_from_slice(&order.pack_argb(px.alpha(), px.red(), px.green(), px.blue()));
        }
        out
    }
}

fn decode_png<R: Read>(reader: R) -> Result<Surface> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    Surface::from_rows(info.width, info.height, info.color_type.samples(), info.line_size, &buf)
}

fn decode_raster(data: &[u8]) -> Result<Surface> {
    let decoded = image::load_from_memory(data)?;
    let (width, height) = (decoded.width(), decoded.height());
    if decoded.color().has_alpha() {
        let rgba = decoded.into_rgba8();
        Surface::from_rows(width, height, 4, width as usize * 4, rgba.as_raw())
    } else {
        let rgb = decoded.into_rgb8();
        Surface::from_rows(width, height, 3, width as usize * 3, rgb.as_raw())
    }
}

fn decode_svg(data: &[u8], size: Option<u32>) -> Result<Surface> {
    let opts = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(data, &opts)?;
    let svg_size = tree.size();

    let (width, height, transform) = match size {
        Some(size) => {
            let scale = (size as f32 / svg_size.width()).min(size as f32 / svg_size.height());
            let dx = (size as f32 - svg_size.width() * scale) / 2.0;
            let dy = (size as f32 - svg_size.height() * scale) / 2.0;
            (size, size, Transform::from_scale(scale, scale).post_translate(dx, dy))
        }
        None => (
            svg_size.width().ceil() as u32,
            svg_size.height().ceil() as u32,
            Transform::identity(),
        ),
    };

    let mut pixmap = Pixmap::new(width, height).ok_or(ThemeError::InvalidSize { width, height })?;
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(Surface { pixmap, has_alpha: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_png(path: &Path, width: u32, height: u32, color: png::ColorType, data: &[u8]) {
        let file = File::create(path).unwrap();
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }

    #[test]
    fn rgb_rows_become_opaque() {
        let s = Surface::from_rows(2, 1, 3, 6, &[10, 20, 30, 40, 50, 60]).unwrap();
        let px = s.pixel(1, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (40, 50, 60, 255));
        assert!(!s.has_alpha());
    }

    #[test]
    fn rgba_rows_are_premultiplied() {
        let s = Surface::from_rows(1, 1, 4, 4, &[255, 128, 0, 128]).unwrap();
        let px = s.pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (128, 64, 0, 128));
        assert!(s.has_alpha());
    }

    #[test]
    fn padded_stride_is_respected() {
        let src = [1, 2, 3, 0xEE, 4, 5, 6, 0xEE];
        let s = Surface::from_rows(1, 2, 3, 4, &src).unwrap();
        let px = s.pixel(0, 1).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (4, 5, 6));
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(Surface::from_rows(2, 2, 4, 8, &[0; 12]).is_err());
    }

    #[test]
    fn decodes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path, 2, 1, png::ColorType::Rgba, &[255, 0, 0, 255, 0, 0, 255, 0]);
        let s = Surface::load(&path).unwrap();
        assert_eq!((s.width(), s.height()), (2, 1));
        assert_eq!(s.pixel(0, 0).unwrap().red(), 255);
        assert_eq!(s.pixel(1, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn decodes_gray_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.png");
        write_png(&path, 1, 1, png::ColorType::Grayscale, &[77]);
        let px = Surface::load(&path).unwrap().pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (77, 77, 77, 255));
    }

    #[test]
    fn decodes_svg_to_requested_square() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("i.svg");
        let mut f = File::create(&path).unwrap();
        f.write_all(br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="20"><rect width="10" height="20" fill="#00ff00"/></svg>"##)
            .unwrap();
        let s = Surface::load_with_size(&path, Some(16)).unwrap();
        assert_eq!((s.width(), s.height()), (16, 16));
        assert_eq!(s.pixel(8, 8).unwrap().green(), 255);
        assert_eq!(s.pixel(0, 8).unwrap().alpha(), 0);
    }

    #[test]
    fn corrupt_png_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(Surface::load(&path).is_err());
    }

    #[test]
    fn unknown_content_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"just some text").unwrap();
        let err = Surface::load(&path).unwrap_err();
        assert!(matches!(err, ThemeError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_raster_file_is_io_error() {
        let err = Surface::load(Path::new("/nonexistent/x.bmp")).unwrap_err();
        assert!(matches!(err, ThemeError::Io(_)));
    }

    #[test]
    fn decodes_jpeg_as_opaque() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        image::RgbImage::from_pixel(8, 8, image::Rgb([200, 40, 40])).save(&path).unwrap();

        let s = Surface::load(&path).unwrap();
        assert_eq!((s.width(), s.height()), (8, 8));
        assert!(!s.has_alpha());
        let px = s.pixel(4, 4).unwrap();
        assert_eq!(px.alpha(), 255);
        assert!(px.red().abs_diff(200) <= 8, "red {}", px.red());
        assert!(px.green().abs_diff(40) <= 8, "green {}", px.green());
    }

    #[test]
    fn solid_background_has_border_and_fill() {
        let margin = Margin { top: 4, bottom: 4, left: 4, right: 4 };
        let border = Color::from_hex("#ff0000ff").unwrap();
        let fill = Color::from_hex("#0000ffff").unwrap();
        let s = Surface::solid_background(&margin, 2, border, fill);
        assert_eq!((s.width(), s.height()), (28, 28));
        let edge = s.pixel(0, 0).unwrap();
        assert_eq!((edge.red(), edge.blue(), edge.alpha()), (255, 0, 255));
        let edge = s.pixel(1, 14).unwrap();
        assert_eq!(edge.red(), 255);
        let inner = s.pixel(2, 2).unwrap();
        assert_eq!((inner.red(), inner.blue(), inner.alpha()), (0, 255, 255));
    }

    #[test]
    fn solid_background_border_clamped_to_margins() {
        let margin = Margin { top: 1, bottom: 3, left: 3, right: 3 };
        let border = Color::from_hex("#ffffffff").unwrap();
        let fill = Color::from_hex("#000000ff").unwrap();
        let s = Surface::solid_background(&margin, 10, border, fill);
        assert_eq!((s.width(), s.height()), (26, 24));
        assert_eq!(s.pixel(0, 0).unwrap().red(), 255);
        assert_eq!(s.pixel(1, 1).unwrap().red(), 0);
    }

    #[test]
    fn argb_export_follows_byte_order() {
        let s = Surface::from_rows(1, 1, 3, 3, &[1, 2, 3]).unwrap();
        assert_eq!(s.to_argb32_bytes(ByteOrder::Little), vec![3, 2, 1, 255]);
        assert_eq!(s.to_argb32_bytes(ByteOrder::Big), vec![255, 1, 2, 3]);
    }
}
