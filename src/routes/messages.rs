// Wire strings returned in `{"error": ...}` bodies. Existing clients match on them.

pub const WELCOME: &str = "¡Bienvenido a la API de TikTok e Instagram!";

pub const MISSING_URL: &str = "URL no proporcionada";
pub const MISSING_VIDEO_ID: &str = "ID del video no proporcionado";
pub const UNRESOLVED_URL: &str = "No se pudo obtener la URL completa";
pub const INVALID_URL: &str = "URL no válida";

pub const VIDEO_NOT_FOUND: &str = "Video no encontrado o eliminado";
pub const NO_PLAYABLE_URL: &str = "Error al obtener la URL del video";
pub const VIDEO_FETCH_FAILED: &str = "Error al obtener el video";
pub const VIDEO_DOWNLOAD_FAILED: &str = "Error al descargar el video";

pub const NO_DOWNLOADABLE_FILE: &str =
    "No se encontró ningún archivo descargable en la URL proporcionada.";
pub const INSTAGRAM_FETCH_FAILED: &str = "Error al obtener el video de Instagram";
pub const MEDIA_CONNECT_FAILED: &str = "Error al conectar con la URL del video.";
pub const MEDIA_DOWNLOAD_FAILED: &str = "Error durante la descarga del video.";
pub const REQUEST_FAILED: &str = "Error al procesar la solicitud.";
