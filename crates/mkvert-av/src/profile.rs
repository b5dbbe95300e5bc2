//! Encoder profiles for mencoder/x264.
//!
//! Every profile is a typed record, so a misspelled option is a compile
//! error rather than a silently ignored key. Two-pass profiles are separate
//! table entries named `<name>-pass1` and `<name>-pass2`.

use crate::{Error, Result};

/// x264 motion estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEstimation {
    Dia,
    Hex,
    Umh,
    Esa,
}

impl MotionEstimation {
    fn as_str(&self) -> &'static str {
        match self {
            MotionEstimation::Dia => "dia",
            MotionEstimation::Hex => "hex",
            MotionEstimation::Umh => "umh",
            MotionEstimation::Esa => "esa",
        }
    }
}

/// Options passed to mencoder as `-x264encopts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X264Options {
    pub global_header: bool,
    /// kbit/s
    pub vbv_maxrate: u32,
    /// kbit
    pub vbv_bufsize: u32,
    /// Target bitrate, kbit/s.
    pub bitrate: u32,
    pub keyint: u32,
    pub bframes: Option<u32>,
    pub frameref: Option<u32>,
    pub subq: u32,
    pub me: Option<MotionEstimation>,
    pub partitions_all: bool,
    pub fast_pskip: bool,
    pub trellis: Option<u32>,
    pub cabac: bool,
    pub psnr: bool,
    /// H.264 level, e.g. `3.1`.
    pub level: &'static str,
    /// Pass number in a two-pass encode.
    pub pass: Option<u8>,
}

impl X264Options {
    /// Serialize to mencoder's colon-separated `key=value` syntax.
    pub fn to_encopts(&self) -> String {
        let mut opts: Vec<String> = Vec::new();

        if self.global_header {
            opts.push("global_header".to_string());
        }
        opts.push(format!("vbv_maxrate={}", self.vbv_maxrate));
        opts.push(format!("vbv_bufsize={}", self.vbv_bufsize));
        opts.push(format!("bitrate={}", self.bitrate));
        opts.push(format!("keyint={}", self.keyint));
        opts.push("threads=auto".to_string());
        if let Some(bframes) = self.bframes {
            opts.push(format!("bframes={}", bframes));
        }
        if let Some(frameref) = self.frameref {
            opts.push(format!("frameref={}", frameref));
        }
        opts.push(format!("subq={}", self.subq));
        if let Some(me) = self.me {
            opts.push(format!("me={}", me.as_str()));
        }
        if self.partitions_all {
            opts.push("partitions=all".to_string());
        }
        if !self.fast_pskip {
            opts.push("no-fast-pskip=1".to_string());
        }
        if let Some(trellis) = self.trellis {
            opts.push(format!("trellis={}", trellis));
        }
        opts.push(format!("cabac={}", u8::from(self.cabac)));
        if self.psnr {
            opts.push("psnr=yes".to_string());
        }
        opts.push(format!("level={}", self.level));
        if let Some(pass) = self.pass {
            opts.push(format!("pass={}", pass));
        }

        opts.join(":")
    }
}

/// faac audio settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacOptions {
    /// kbit/s
    pub bitrate: u32,
    /// Hz
    pub sample_rate: u32,
}

impl AacOptions {
    /// mencoder audio and output-format arguments.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-oac".to_string(),
            "faac".to_string(),
            "-faacopts".to_string(),
            format!("mpeg=4:object=2:br={}:raw=yes", self.bitrate),
            "-af".to_string(),
            format!("lavcresample={}", self.sample_rate),
            "-of".to_string(),
            "lavf".to_string(),
            "-lavfopts".to_string(),
            "format=mp4".to_string(),
        ]
    }
}

/// A named encoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingProfile {
    pub name: &'static str,
    pub video: X264Options,
    /// Output width; height follows the aspect ratio and nothing is upscaled.
    pub width: u32,
    pub audio: AacOptions,
}

impl EncodingProfile {
    /// A copy with the video bitrate replaced and everything else untouched.
    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.video.bitrate = kbps;
        self
    }

    /// mencoder video arguments.
    pub fn video_args(&self) -> Vec<String> {
        vec![
            "-ovc".to_string(),
            "x264".to_string(),
            "-x264encopts".to_string(),
            self.video.to_encopts(),
            "-vf".to_string(),
            format!("scale=w={}:h=-1:noup=1,harddup", self.width),
        ]
    }
}

const AAC_128: AacOptions = AacOptions {
    bitrate: 128,
    sample_rate: 44100,
};

const IPOD: X264Options = X264Options {
    global_header: true,
    vbv_maxrate: 1500,
    vbv_bufsize: 2000,
    bitrate: 1200,
    keyint: 500,
    bframes: None,
    frameref: None,
    subq: 6,
    me: Some(MotionEstimation::Umh),
    partitions_all: false,
    fast_pskip: true,
    trellis: None,
    cabac: false,
    psnr: true,
    level: "3",
    pass: None,
};

const APPLETV_HD: X264Options = X264Options {
    global_header: true,
    vbv_maxrate: 5000,
    vbv_bufsize: 2000,
    bitrate: 2500,
    keyint: 500,
    bframes: Some(0),
    frameref: Some(1),
    subq: 6,
    me: Some(MotionEstimation::Umh),
    partitions_all: false,
    fast_pskip: false,
    trellis: Some(2),
    cabac: false,
    psnr: false,
    level: "3.1",
    pass: None,
};

static PROFILES: [EncodingProfile; 6] = [
    EncodingProfile {
        name: "ipod",
        video: IPOD,
        width: 640,
        audio: AAC_128,
    },
    EncodingProfile {
        name: "ipod-pass1",
        video: X264Options {
            bitrate: 1000,
            subq: 1,
            me: None,
            pass: Some(1),
            ..IPOD
        },
        width: 640,
        audio: AAC_128,
    },
    EncodingProfile {
        name: "ipod-pass2",
        video: X264Options {
            bitrate: 1000,
            pass: Some(2),
            ..IPOD
        },
        width: 640,
        audio: AAC_128,
    },
    EncodingProfile {
        name: "appletv-hd",
        video: APPLETV_HD,
        width: 1280,
        audio: AAC_128,
    },
    EncodingProfile {
        name: "appletv-hd-pass1",
        video: X264Options {
            subq: 1,
            me: None,
            pass: Some(1),
            ..APPLETV_HD
        },
        width: 1280,
        audio: AAC_128,
    },
    EncodingProfile {
        name: "appletv-hd-pass2",
        video: X264Options {
            subq: 5,
            partitions_all: true,
            pass: Some(2),
            ..APPLETV_HD
        },
        width: 1280,
        audio: AAC_128,
    },
];

/// Read-only lookup over the built-in profiles.
pub struct ProfileTable;

impl ProfileTable {
    /// Every profile, pass variants included.
    pub fn all() -> &'static [EncodingProfile] {
        &PROFILES
    }

    /// Names a user can select (pass variants excluded).
    pub fn base_names() -> impl Iterator<Item = &'static str> {
        PROFILES
            .iter()
            .map(|p| p.name)
            .filter(|name| !name.ends_with("-pass1") && !name.ends_with("-pass2"))
    }

    pub fn get(name: &str) -> Result<&'static EncodingProfile> {
        PROFILES
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))
    }

    /// The `-pass1` and `-pass2` variants of `name`.
    pub fn passes(
        name: &str,
    ) -> Result<(&'static EncodingProfile, &'static EncodingProfile)> {
        Self::get(name)?;
        let first = Self::get(&format!("{}-pass1", name))?;
        let second = Self::get(&format!("{}-pass2", name))?;
        Ok((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn ipod_encopts() {
        let profile = ProfileTable::get("ipod").unwrap();
        assert_eq!(
            profile.video.to_encopts(),
            "global_header:vbv_maxrate=1500:vbv_bufsize=2000:bitrate=1200:keyint=500:\
             threads=auto:subq=6:me=umh:cabac=0:psnr=yes:level=3"
        );
    }

    #[test]
    fn appletv_hd_encopts_spell_frameref() {
        let profile = ProfileTable::get("appletv-hd").unwrap();
        assert_eq!(
            profile.video.to_encopts(),
            "global_header:vbv_maxrate=5000:vbv_bufsize=2000:bitrate=2500:keyint=500:\
             threads=auto:bframes=0:frameref=1:subq=6:me=umh:no-fast-pskip=1:\
             trellis=2:cabac=0:level=3.1"
        );
    }

    #[test]
    fn appletv_pass2_encopts() {
        let profile = ProfileTable::get("appletv-hd-pass2").unwrap();
        assert_eq!(
            profile.video.to_encopts(),
            "global_header:vbv_maxrate=5000:vbv_bufsize=2000:bitrate=2500:keyint=500:\
             threads=auto:bframes=0:frameref=1:subq=5:me=umh:partitions=all:\
             no-fast-pskip=1:trellis=2:cabac=0:level=3.1:pass=2"
        );
    }

    #[test]
    fn bitrate_override_touches_only_bitrate() {
        let base = *ProfileTable::get("ipod").unwrap();
        let overridden = base.with_bitrate(800);
        assert_eq!(overridden.video.bitrate, 800);
        assert_eq!(
            overridden.video.to_encopts(),
            base.video.to_encopts().replace("bitrate=1200", "bitrate=800")
        );
        assert_eq!(overridden.audio, base.audio);
    }

    #[test]
    fn passes_are_looked_up_by_suffix() {
        let (first, second) = ProfileTable::passes("appletv-hd").unwrap();
        assert_eq!(first.name, "appletv-hd-pass1");
        assert_eq!(first.video.pass, Some(1));
        assert_eq!(second.name, "appletv-hd-pass2");
        assert_eq!(second.video.pass, Some(2));
    }

    #[test]
    fn unknown_profile() {
        assert_matches!(ProfileTable::get("psp"), Err(Error::UnknownProfile(ref n)) if n == "psp");
        assert_matches!(ProfileTable::passes("psp"), Err(Error::UnknownProfile(_)));
    }

    #[test]
    fn base_names_exclude_pass_variants() {
        let names: Vec<_> = ProfileTable::base_names().collect();
        assert_eq!(names, vec!["ipod", "appletv-hd"]);
    }

    #[test]
    fn video_args_scale_to_profile_width() {
        let args = ProfileTable::get("appletv-hd").unwrap().video_args();
        assert_eq!(args[0..3], ["-ovc", "x264", "-x264encopts"]);
        assert_eq!(args[5], "scale=w=1280:h=-1:noup=1,harddup");
    }
}
