//! Calibration points for the Sersic mixture table.
//!
//! Each range lists `(index, amplitudes, variances)` fits with a constant
//! component count. The `lo..hi` windows extend slightly past the first and
//! last fitted index so that neighbouring ranges overlap; queries inside an
//! overlap blend both ranges.

pub(super) struct RangeData {
    pub lo: f64,
    pub hi: f64,
    pub knots: &'static [(f64, &'static [f64], &'static [f64])],
}

pub(super) const RANGES: &[RangeData] = &[
    // 0.3 to 0.4: 3 components
    RangeData {
        lo: 0.3,
        hi: 0.41,
        knots: &[
            (
                0.3,
                &[58.7009, 26.6643, -77.6263],
                &[0.374934, 0.259725, 0.309937],
            ),
            (
                0.31,
                &[55.832, 26.0986, -74.1271],
                &[0.383453, 0.266779, 0.316079],
            ),
            (
                0.32,
                &[52.1761, 20.7647, -65.0721],
                &[0.393596, 0.270377, 0.324867],
            ),
            (
                0.33,
                &[48.2145, 20.5634, -60.8428],
                &[0.404221, 0.278975, 0.331068],
            ),
            (
                0.34,
                &[44.6425, 19.8606, -56.5018],
                &[0.415356, 0.287766, 0.33808],
            ),
            (
                0.35,
                &[38.474, 19.0401, -49.4458],
                &[0.430137, 0.296236, 0.342944],
            ),
            (
                0.36,
                &[35.4008, 15.8085, -43.0745],
                &[0.443372, 0.304082, 0.35272],
            ),
            (
                0.37,
                &[31.2277, 9.84678, -32.8717],
                &[0.459762, 0.306352, 0.364545],
            ),
            (
                0.38,
                &[31.7832, 9.33791, -32.8517],
                &[0.469717, 0.322657, 0.37966],
            ),
            (
                0.39,
                &[27.5299, 8.56064, -27.7538],
                &[0.487979, 0.337244, 0.387988],
            ),
            (
                0.4,
                &[25.3526, 8.26534, -25.2139],
                &[0.504439, 0.35851, 0.401166],
            ),
        ],
    },
    // 0.4 to 0.55: 2 components
    RangeData {
        lo: 0.39,
        hi: 0.56,
        knots: &[
            (
                0.4,
                &[30.6846, -22.2722],
                &[0.508451, 0.446199],
            ),
            (
                0.41,
                &[25.0737, -16.5994],
                &[0.524289, 0.446576],
            ),
            (
                0.42,
                &[18.0254, -9.4867],
                &[0.550982, 0.434251],
            ),
            (
                0.43,
                &[13.6102, -5.00379],
                &[0.584497, 0.409865],
            ),
            (
                0.44,
                &[11.7669, -3.09259],
                &[0.612188, 0.389683],
            ),
            (
                0.45,
                &[10.7878, -2.04641],
                &[0.635513, 0.373375],
            ),
            (
                0.46,
                &[10.1779, -1.37019],
                &[0.655982, 0.359586],
            ),
            (
                0.47,
                &[9.76207, -0.888915],
                &[0.6744, 0.347566],
            ),
            (
                0.48,
                &[9.4625, -0.524704],
                &[0.69123, 0.336936],
            ),
            (
                0.49,
                &[9.23869, -0.237081],
                &[0.706771, 0.327762],
            ),
            (
                0.5,
                &[9.06469, 0.0],
                &[0.721344, 0.31748],
            ),
            (
                0.51,
                &[8.93379, 0.192965],
                &[0.734739, 0.307521],
            ),
            (
                0.52,
                &[8.82887, 0.359221],
                &[0.747417, 0.300307],
            ),
            (
                0.53,
                &[8.74585, 0.502753],
                &[0.759346, 0.293121],
            ),
            (
                0.54,
                &[8.68019, 0.628124],
                &[0.770591, 0.286212],
            ),
            (
                0.55,
                &[8.6284, 0.738804],
                &[0.781204, 0.279618],
            ),
        ],
    },
    // 0.55 to 0.6: 3 components
    RangeData {
        lo: 0.54,
        hi: 0.61,
        knots: &[
            (
                0.55,
                &[7.74689, 1.58844, 0.0471616],
                &[0.819452, 0.417783, 0.087336],
            ),
            (
                0.6,
                &[7.24439, 2.34223, 0.101213],
                &[0.903276, 0.400292, 0.0809628],
            ),
        ],
    },
    // 0.6 to 0.7: 4 components
    RangeData {
        lo: 0.59,
        hi: 0.71,
        knots: &[
            (
                0.6,
                &[6.51642, 2.93043, 0.23537, 0.0110102],
                &[0.936973, 0.470973, 0.145644, 0.0262609],
            ),
            (
                0.65,
                &[6.20741, 3.40835, 0.356027, 0.0186731],
                &[1.02778, 0.464541, 0.138526, 0.0241383],
            ),
            (
                0.7,
                &[6.09066, 3.69635, 0.462077, 0.0267968],
                &[1.10839, 0.456139, 0.130467, 0.0219376],
            ),
        ],
    },
    // 0.7 to 0.8: 5 components
    RangeData {
        lo: 0.69,
        hi: 0.81,
        knots: &[
            (
                0.7,
                &[5.84168, 3.79731, 0.577526, 0.0579033, 0.00354215],
                &[1.12585, 0.48453, 0.161388, 0.042217, 0.0069345],
            ),
            (
                0.75,
                &[5.76156, 3.9978, 0.710656, 0.0784835, 0.00500513],
                &[1.20661, 0.48315, 0.156679, 0.0399674, 0.00632141],
            ),
            (
                0.8,
                &[5.81724, 4.10126, 0.796872, 0.0949571, 0.00637949],
                &[1.27229, 0.472825, 0.147499, 0.0367043, 0.00562926],
            ),
        ],
    },
    // 0.8 to 1.5: 6 components
    RangeData {
        lo: 0.79,
        hi: 1.51,
        knots: &[
            (
                0.8,
                &[5.72857, 4.08637, 0.856856, 0.12965, 0.0149739, 0.00101254],
                &[1.28015, 0.486267, 0.164269, 0.0495874, 0.012034, 0.001834],
            ),
            (
                0.85,
                &[5.79045, 4.17745, 0.935745, 0.146717, 0.0190671, 0.00142406],
                &[1.34252, 0.477737, 0.154878, 0.0459309, 0.0114826, 0.00173367],
            ),
            (
                0.9,
                &[5.8557, 4.23792, 1.02098, 0.174855, 0.0229433, 0.0017022],
                &[1.39994, 0.47177, 0.149963, 0.0438891, 0.0104706, 0.00152136],
            ),
            (
                0.95,
                &[5.9249, 4.29628, 1.10244, 0.196489, 0.0260153, 0.00193019],
                &[1.45307, 0.466037, 0.144107, 0.0408279, 0.00939357, 0.00130824],
            ),
            (
                1.0,
                &[5.9993, 4.33731, 1.1797, 0.223345, 0.0308597, 0.00236367],
                &[1.50134, 0.460918, 0.140004, 0.0391621, 0.00886677, 0.0012064],
            ),
            (
                1.1,
                &[6.15062, 4.41112, 1.3184, 0.274191, 0.0403516, 0.00320267],
                &[1.58689, 0.450782, 0.13188, 0.0356906, 0.00775213, 0.00100251],
            ),
            (
                1.2,
                &[6.30488, 4.46833, 1.44113, 0.325257, 0.0503063, 0.00417751],
                &[1.65866, 0.440764, 0.124769, 0.0327207, 0.00682769, 0.000840013],
            ),
            (
                1.3,
                &[6.45554, 4.5196, 1.55166, 0.370943, 0.0599356, 0.00513795],
                &[1.71804, 0.430598, 0.117757, 0.0297864, 0.00597877, 0.000701129],
            ),
            (
                1.4,
                &[6.60022, 4.57474, 1.64799, 0.41237, 0.0688686, 0.00608043],
                &[1.76906, 0.420073, 0.110836, 0.0270161, 0.00520979, 0.000584642],
            ),
            (
                1.5,
                &[6.74056, 4.62707, 1.73452, 0.450323, 0.0774227, 0.00701844],
                &[1.81111, 0.409301, 0.104252, 0.0244973, 0.00454782, 0.000489254],
            ),
        ],
    },
    // 1.5 to 3.0: 7 components
    RangeData {
        lo: 1.49,
        hi: 3.01,
        knots: &[
            (
                1.5,
                &[6.65296, 4.5365, 1.77608, 0.534095, 0.121048, 0.0193193, 0.00168448],
                &[1.82965, 0.427338, 0.118659, 0.0325505, 0.0078754, 0.00149129, 0.000162814],
            ),
            (
                2.0,
                &[7.17044, 4.75678, 2.16275, 0.741344, 0.188867, 0.0326777, 0.00301683],
                &[1.9857, 0.389519, 0.0944922, 0.022482, 0.0046957, 0.000750913, 6.74e-05],
            ),
            (
                2.5,
                &[7.65858, 4.9943, 2.39882, 0.865786, 0.230782, 0.04241, 0.0042324],
                &[2.02962, 0.340732, 0.0718239, 0.014861, 0.00271533, 0.000383584, 3.00206e-05],
            ),
            (
                3.0,
                &[8.14037, 5.24329, 2.54101, 0.923932, 0.249893, 0.0470254, 0.00479733],
                &[1.99866, 0.287531, 0.0523859, 0.00945259, 0.00152236, 0.0001892, 1.27979e-05],
            ),
        ],
    },
    // 3.0 to 6.0: 8 components
    RangeData {
        lo: 2.99,
        hi: 6.3,
        knots: &[
            (
                3.0,
                &[7.87232, 5.07258, 2.66081, 1.11232, 0.365881, 0.0926224, 0.0165507, 0.00161176],
                &[2.09507, 0.330596, 0.0687515, 0.0145811, 0.00289201, 0.000496723, 6.45785e-05, 4.44168e-06],
            ),
            (
                3.5,
                &[8.26554, 5.31143, 2.79218, 1.16256, 0.383548, 0.0976501, 0.017588, 0.00172762],
                &[2.04798, 0.283894, 0.0518779, 0.00976488, 0.00173505, 0.000267361, 3.10708e-05, 1.87943e-06],
            ),
            (
                4.0,
                &[8.65627, 5.50634, 2.87134, 1.19673, 0.400426, 0.10483, 0.0198332, 0.00218661],
                &[1.95977, 0.240023, 0.0393048, 0.00674924, 0.00110933, 0.000160124, 1.77664e-05, 1.07394e-06],
            ),
            (
                4.5,
                &[9.00456, 5.64352, 2.92525, 1.23383, 0.427533, 0.117941, 0.0244185, 0.00328944],
                &[1.84749, 0.203298, 0.03064, 0.004962, 0.000782651, 0.000110466, 1.24447e-05, 8.27834e-07],
            ),
            (
                5.0,
                &[9.2961, 5.76668, 2.99406, 1.28498, 0.459058, 0.13421, 0.0305669, 0.00507611],
                &[1.75252, 0.176279, 0.0248229, 0.00382292, 0.000585089, 8.23458e-05, 9.65048e-06, 7.17946e-07],
            ),
            (
                5.5,
                &[9.55807, 5.85539, 3.0431, 1.33049, 0.492889, 0.152725, 0.0381639, 0.00763464],
                &[1.6416, 0.152463, 0.0203278, 0.00302516, 0.000455831, 6.46416e-05, 7.92232e-06, 6.48294e-07],
            ),
            (
                6.0,
                &[9.78493, 5.92322, 3.08588, 1.37586, 0.528438, 0.17316, 0.0471653, 0.0111286],
                &[1.52974, 0.132573, 0.0169092, 0.00245403, 0.000366917, 5.27406e-05, 6.76649e-06, 6.00237e-07],
            ),
        ],
    },
];
